pub mod engine;
pub mod memory;
pub mod runtime;

use crate::{
    composer::{
        engine::{
            ContainerId, EngineConfig, EngineError, EngineEvent, EngineEventKind, Format,
            FormatSet, RichTextEngine, SubscriptionId,
        },
        runtime::{EngineHost, EngineLoadError},
    },
    config::ClientConfig,
    feed::{FeedError, FeedStore},
    guard::{AuthGuard, Feature, Gated, Notice},
};
use murmur_common::{
    model::post::{Author, CreatePost, Post},
    util::PositiveDuration,
};
use parking_lot::Mutex;
use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_EMOJI: &str = "😊";

pub const EMOJI_PALETTE: [&str; 90] = [
    "😀", "😃", "😄", "😁", "😆", "😅", "😂", "🤣", "😊", "😇", //
    "🙂", "🙃", "😉", "😌", "😍", "🥰", "😘", "😗", "😙", "😚", //
    "😋", "😛", "😝", "😜", "🤪", "🤨", "🧐", "🤓", "😎", "🥸", //
    "🤩", "🥳", "😏", "😒", "😞", "😔", "😟", "😕", "🙁", "☹️", //
    "😣", "😖", "😫", "😩", "🥺", "😢", "😭", "😤", "😠", "😡", //
    "🤬", "🤯", "😳", "🥵", "🥶", "😱", "😨", "😰", "😥", "😓", //
    "🤗", "🤔", "🤭", "🤫", "🤥", "😶", "😐", "😑", "😬", "🙄", //
    "😯", "😦", "😧", "😮", "😲", "🥱", "😴", "🤤", "😪", "😵", //
    "🤐", "🥴", "🤢", "🤮", "🤧", "😷", "🤒", "🤕", "🤑", "🤠", //
];

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub enum ComposerState {
    #[default]
    Uninitialized,
    EngineLoading,
    Ready,
    Publishing,
}

/// What the composer shows around the editor.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct DraftState {
    pub has_text: bool,
    /// Toolbar marks active at the current selection.
    pub active_formats: FormatSet,
    pub selected_emoji: String,
    pub emoji_picker_open: bool,
}

impl Default for DraftState {
    fn default() -> Self {
        Self {
            has_text: false,
            active_formats: FormatSet::new(),
            selected_emoji: DEFAULT_EMOJI.to_owned(),
            emoji_picker_open: false,
        }
    }
}

/// Composer buttons without an implementation.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Affordance {
    Attachment,
    VoiceMessage,
    Photo,
}

impl From<Affordance> for Feature {
    fn from(value: Affordance) -> Self {
        match value {
            Affordance::Attachment => Feature::Attachment,
            Affordance::VoiceMessage => Feature::VoiceMessage,
            Affordance::Photo => Feature::Photo,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum PublishOutcome {
    Published(Post),
    AuthRequired,
    NotReady,
    AlreadyPublishing,
    Empty,
    /// The composer was unmounted while the publish was pending.
    Abandoned,
    /// The session ended while the publish was pending; the draft was dropped.
    SessionEnded,
}

#[derive(Debug, Error)]
pub enum ComposerError {
    #[error("The editor is not ready")]
    NotReady,
    #[error("The composer was unmounted")]
    Unmounted,
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    EngineLoad(#[from] EngineLoadError),
    #[error(transparent)]
    Feed(#[from] FeedError),
}

struct Editor {
    engine: Box<dyn RichTextEngine>,
    subscriptions: Vec<SubscriptionId>,
}

impl Editor {
    fn release(mut self) {
        for id in self.subscriptions.drain(..) {
            self.engine.unsubscribe(id);
        }
        self.engine.detach();
    }
}

/// The post editor: one rich-text editor plus the draft around it.
///
/// Cloning yields another handle to the same composer. Lock order is state before editor; the
/// draft lock is never held while calling into the editor, whose handlers take it.
#[derive(Clone)]
pub struct Composer {
    inner: Arc<ComposerInner>,
}

struct ComposerInner {
    guard: AuthGuard,
    feed: FeedStore,
    engines: Arc<EngineHost>,
    container: ContainerId,
    engine_config: EngineConfig,
    publish_delay: PositiveDuration,
    state: Mutex<ComposerState>,
    editor: Mutex<Option<Editor>>,
    draft: Arc<Mutex<DraftState>>,
    mounted: CancellationToken,
}

impl Composer {
    #[must_use]
    pub fn new(
        guard: AuthGuard,
        feed: FeedStore,
        engines: Arc<EngineHost>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ComposerInner {
                guard,
                feed,
                engines,
                container: config.container.clone(),
                engine_config: EngineConfig::composer(config.placeholder.clone()),
                publish_delay: config.publish_delay,
                state: Mutex::new(ComposerState::Uninitialized),
                editor: Mutex::new(None),
                draft: Arc::new(Mutex::new(DraftState::default())),
                mounted: CancellationToken::new(),
            }),
        }
    }

    /// Loads the editor runtime if needed and binds the editor to the container.
    ///
    /// Mounting an already ready composer does nothing. After a failed load the composer stays
    /// in [`ComposerState::EngineLoading`] and a later call tries again.
    pub async fn mount(&self) -> Result<(), ComposerError> {
        if self.inner.mounted.is_cancelled() {
            return Err(ComposerError::Unmounted);
        }
        {
            let mut state = self.inner.state.lock();
            if matches!(*state, ComposerState::Ready | ComposerState::Publishing) {
                return Ok(());
            }
            *state = ComposerState::EngineLoading;
        }
        debug!(container = %self.inner.container, "Mounting composer");

        let runtime = match self.inner.engines.runtime().await {
            Ok(runtime) => runtime,
            Err(err) => {
                warn!(error = %err, "Editor failed to load");
                return Err(err.into());
            }
        };
        if self.inner.mounted.is_cancelled() {
            debug!("Composer unmounted while the editor was loading");
            return Err(ComposerError::Unmounted);
        }

        let mut state = self.inner.state.lock();
        let mut editor = self.inner.editor.lock();
        if editor.is_some() {
            return Ok(());
        }

        let mut engine = runtime.construct(&self.inner.container, &self.inner.engine_config)?;
        let subscriptions = vec![
            engine.subscribe(EngineEventKind::TextChange, {
                let draft = Arc::clone(&self.inner.draft);
                Arc::new(move |event: &EngineEvent| {
                    if let EngineEvent::TextChange { text } = event {
                        draft.lock().has_text = !text.trim().is_empty();
                    }
                })
            }),
            engine.subscribe(EngineEventKind::SelectionChange, {
                let draft = Arc::clone(&self.inner.draft);
                Arc::new(move |event: &EngineEvent| {
                    if let EngineEvent::SelectionChange { formats } = event {
                        draft.lock().active_formats = toolbar_marks(formats);
                    }
                })
            }),
        ];

        *editor = Some(Editor {
            engine,
            subscriptions,
        });
        *state = ComposerState::Ready;
        info!(container = %self.inner.container, "Composer ready");

        Ok(())
    }

    /// Flips a mark at the current selection and returns focus to the editor.
    pub fn toggle_format(&self, format: Format) -> Result<(), ComposerError> {
        let formats = {
            let state = self.inner.state.lock();
            let mut editor = self.inner.editor.lock();
            let editor = match (*state, editor.as_mut()) {
                (ComposerState::Ready, Some(editor)) => editor,
                _ => return Err(ComposerError::NotReady),
            };

            let enabled = editor.engine.current_format().contains(&format);
            editor.engine.set_format(format, !enabled)?;
            editor.engine.focus();
            editor.engine.current_format()
        };

        self.inner.draft.lock().active_formats = toolbar_marks(&formats);
        Ok(())
    }

    pub fn select_emoji(&self, emoji: &str) {
        let mut draft = self.inner.draft.lock();
        draft.selected_emoji = emoji.to_owned();
        draft.emoji_picker_open = false;
    }

    pub fn toggle_emoji_picker(&self) -> bool {
        let mut draft = self.inner.draft.lock();
        draft.emoji_picker_open = !draft.emoji_picker_open;
        draft.emoji_picker_open
    }

    /// Empties the editor. The selected emoji stays.
    pub fn discard(&self) -> Result<(), ComposerError> {
        {
            let state = self.inner.state.lock();
            let mut editor = self.inner.editor.lock();
            match (*state, editor.as_mut()) {
                (ComposerState::Ready, Some(editor)) => editor.engine.clear_contents(),
                _ => return Err(ComposerError::NotReady),
            }
        }

        self.inner.draft.lock().has_text = false;
        Ok(())
    }

    pub async fn publish(&self) -> Result<PublishOutcome, ComposerError> {
        if self.inner.guard.require().is_none() {
            return Ok(PublishOutcome::AuthRequired);
        }

        {
            let mut state = self.inner.state.lock();
            match *state {
                ComposerState::Ready => {}
                ComposerState::Publishing => return Ok(PublishOutcome::AlreadyPublishing),
                ComposerState::Uninitialized | ComposerState::EngineLoading => {
                    return Ok(PublishOutcome::NotReady);
                }
            }

            let editor = self.inner.editor.lock();
            let Some(editor) = editor.as_ref() else {
                return Ok(PublishOutcome::NotReady);
            };
            if editor.engine.plain_text().trim().is_empty() {
                return Ok(PublishOutcome::Empty);
            }
            *state = ComposerState::Publishing;
        }
        debug!("Publishing post");

        tokio::time::sleep(self.inner.publish_delay.as_std()).await;

        if self.inner.mounted.is_cancelled() {
            debug!("Composer unmounted while publishing");
            return Ok(PublishOutcome::Abandoned);
        }

        let content = {
            let mut state = self.inner.state.lock();
            let mut editor = self.inner.editor.lock();
            let Some(editor) = editor.as_mut() else {
                *state = ComposerState::Uninitialized;
                return Ok(PublishOutcome::Abandoned);
            };

            let content = editor.engine.markup();
            editor.engine.clear_contents();
            *state = ComposerState::Ready;
            content
        };
        let emoji = {
            let mut draft = self.inner.draft.lock();
            draft.has_text = false;
            draft.selected_emoji.clone()
        };

        let Some(user) = self.inner.guard.session().user() else {
            warn!("Session ended while publishing, dropping the post");
            return Ok(PublishOutcome::SessionEnded);
        };

        let post = self.inner.feed.prepend(CreatePost {
            author: Author::from(&user),
            content,
            emoji,
        })?;
        info!(post_id = %post.id, author = %post.author.name, "Published post");

        Ok(PublishOutcome::Published(post))
    }

    pub fn invoke(&self, affordance: Affordance) -> Gated<Notice> {
        self.inner.guard.stub(affordance.into())
    }

    /// Releases the editor. Pending work finishes without touching the feed.
    pub fn unmount(&self) {
        self.inner.mounted.cancel();

        let editor = {
            let mut state = self.inner.state.lock();
            *state = ComposerState::Uninitialized;
            self.inner.editor.lock().take()
        };
        if let Some(editor) = editor {
            editor.release();
        }
        debug!(container = %self.inner.container, "Composer unmounted");
    }

    /// Whether the publish button is enabled.
    #[must_use]
    pub fn can_publish(&self) -> bool {
        *self.inner.state.lock() == ComposerState::Ready && self.inner.draft.lock().has_text
    }

    #[must_use]
    pub fn state(&self) -> ComposerState {
        *self.inner.state.lock()
    }

    #[must_use]
    pub fn draft(&self) -> DraftState {
        self.inner.draft.lock().clone()
    }

    #[must_use]
    pub fn container(&self) -> &ContainerId {
        &self.inner.container
    }
}

impl Debug for Composer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Composer")
            .field("container", &self.inner.container)
            .field("state", &self.state())
            .field("draft", &self.draft())
            .finish_non_exhaustive()
    }
}

fn toolbar_marks(formats: &FormatSet) -> FormatSet {
    formats
        .iter()
        .copied()
        .filter(|format| format.is_toolbar_mark())
        .collect()
}
