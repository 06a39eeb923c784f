use crate::command::{Command, HELP};
use murmur_client::{
    composer::{
        Composer, ComposerError, EMOJI_PALETTE, PublishOutcome,
        memory::MemoryRuntime,
        runtime::{BundledLoader, EngineHost},
    },
    config::ClientConfig,
    credentials::CredentialStore,
    dialog::{DialogMode, DialogResponse, ElementId, Key, Rect, UiEvent},
    feed::{FeedError, FeedStore},
    forms::{AuthDialog, SubmitOutcome},
    guard::{AuthGuard, Gated, Notice},
    session::{SessionManager, network::SimulatedNetwork, store::KeyValueStore},
};
use murmur_common::{model::post::Post, snowflake::ClientId};
use std::{fmt::Write, sync::Arc};
use thiserror::Error;
use time::UtcDateTime;
use tracing::debug;

/// Where the terminal pretends the dialog is drawn.
const DIALOG_BOUNDS: Rect = Rect {
    x: 20,
    y: 5,
    width: 40,
    height: 15,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Composer(#[from] ComposerError),
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error("There is no post at position {0}")]
    NoSuchPosition(usize),
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Flow {
    Continue,
    Quit,
}

/// Every client component wired into one terminal session.
#[derive(Debug)]
pub struct App {
    config: ClientConfig,
    session: SessionManager,
    auth: AuthDialog,
    feed: FeedStore,
    guard: AuthGuard,
    runtime: Arc<MemoryRuntime>,
    composer: Composer,
}

impl App {
    #[must_use]
    pub fn new(config: ClientConfig, store: Arc<dyn KeyValueStore>) -> Self {
        let session = SessionManager::new(
            CredentialStore::demo(),
            store,
            Arc::new(SimulatedNetwork::new(config.network_latency)),
        );
        let auth = AuthDialog::new(session.clone());
        auth.dialog().set_bounds(DIALOG_BOUNDS);
        let guard = AuthGuard::new(session.clone(), auth.prompt());

        let feed = FeedStore::new(ClientId::random());
        let runtime = Arc::new(MemoryRuntime::new());
        let engines = Arc::new(EngineHost::new(
            Arc::new(BundledLoader::new(Arc::clone(&runtime))),
            config.engine_assets.clone(),
        ));
        let composer = Composer::new(guard.clone(), feed.clone(), engines, &config);

        Self {
            config,
            session,
            auth,
            feed,
            guard,
            runtime,
            composer,
        }
    }

    /// Restores the previous session, seeds the feed and mounts the composer.
    pub async fn start(&self) -> Result<String, AppError> {
        let session = self.session.restore();
        self.feed.seed_demo()?;
        self.composer.mount().await?;

        Ok(match session.user() {
            Some(user) => format!("Welcome back, {}.", user.name),
            None => "Browsing as a guest. `login` or `open` to sign in.".to_owned(),
        })
    }

    /// Runs one command and returns what to print.
    pub async fn execute(&self, command: Command) -> Result<(Flow, String), AppError> {
        debug!(?command, "Executing command");

        let output = match command {
            Command::Help => HELP.to_owned(),
            Command::Quit => return Ok((Flow::Quit, "Bye.".to_owned())),
            Command::Login { email, password } => {
                self.open_dialog(DialogMode::Login);
                let outcome = self.auth.login().submit(&email, &password).await;
                self.describe_submit(outcome, self.auth.login().status().error.as_deref())
            }
            Command::Signup {
                name,
                email,
                password,
            } => {
                self.open_dialog(DialogMode::Signup);
                let outcome = self.auth.signup().submit(&name, &email, &password).await;
                self.describe_submit(outcome, self.auth.signup().status().error.as_deref())
            }
            Command::Logout => {
                self.session.logout();
                "Logged out.".to_owned()
            }
            Command::WhoAmI => match self.session.user() {
                Some(user) => format!("{} <{}> ({})", user.name, user.email, user.id),
                None => "Not logged in.".to_owned(),
            },
            Command::Type(text) => self.type_text(&text),
            Command::NewLine => self.type_text("\n"),
            Command::Format(format) => {
                self.composer.toggle_format(format)?;
                let active: Vec<_> = self
                    .composer
                    .draft()
                    .active_formats
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                format!("Active formats: [{}]", active.join(", "))
            }
            Command::Emoji(emoji) => {
                self.composer.select_emoji(&emoji);
                format!("Feeling {emoji}")
            }
            Command::Emojis => {
                self.composer.toggle_emoji_picker();
                EMOJI_PALETTE
                    .chunks(10)
                    .map(|row| row.join(" "))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Command::Discard => {
                self.composer.discard()?;
                "Draft discarded.".to_owned()
            }
            Command::Publish => self.publish().await?,
            Command::Feed => render_feed(&self.feed.list()),
            Command::Interact {
                interaction,
                position,
            } => {
                let post = position
                    .checked_sub(1)
                    .and_then(|index| self.feed.list().into_iter().nth(index))
                    .ok_or(AppError::NoSuchPosition(position))?;
                describe_gate(self.feed.interact(&self.guard, post.id, interaction)?)
            }
            Command::Affordance(affordance) => describe_gate(self.composer.invoke(affordance)),
            Command::Open(mode) => {
                self.auth.open(mode);
                self.describe_dialog()
            }
            Command::Switch => {
                self.auth.switch_mode();
                self.describe_dialog()
            }
            Command::Escape => self.dispatch(&UiEvent::KeyDown {
                key: Key::Escape,
                shift: false,
            }),
            Command::Tab { backwards } => self.dispatch(&UiEvent::KeyDown {
                key: Key::Tab,
                shift: backwards,
            }),
            Command::Click(point) => self.dispatch(&UiEvent::PointerDown(point)),
            Command::Focus(id) => self.dispatch(&UiEvent::FocusIn(ElementId::new(id))),
        };

        Ok((Flow::Continue, output))
    }

    fn open_dialog(&self, mode: DialogMode) {
        let dialog = self.auth.dialog();
        if !dialog.is_open() {
            self.auth.open(mode);
        } else if dialog.mode() != mode {
            self.auth.switch_mode();
        }
    }

    fn describe_submit(&self, outcome: SubmitOutcome, error: Option<&str>) -> String {
        match outcome {
            SubmitOutcome::Invalid(errors) => errors
                .values()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
            SubmitOutcome::Busy => "Still working on the previous request.".to_owned(),
            SubmitOutcome::Rejected | SubmitOutcome::Failed => error.unwrap_or_default().to_owned(),
            SubmitOutcome::Succeeded { restore_focus } => {
                let name = self.session.user().map(|user| user.name).unwrap_or_default();
                match restore_focus {
                    Some(element) => format!("Signed in as {name}. Focus back on {element}."),
                    None => format!("Signed in as {name}."),
                }
            }
        }
    }

    fn type_text(&self, text: &str) -> String {
        match self.runtime.engine(&self.config.container) {
            Some(engine) => {
                engine.type_text(text);
                let draft = engine.text();
                format!("Draft: {:?}", draft.trim_end_matches('\n'))
            }
            None => "The editor is still loading.".to_owned(),
        }
    }

    async fn publish(&self) -> Result<String, AppError> {
        let message = match self.composer.publish().await? {
            PublishOutcome::Published(post) => format!("Published:\n{}", render_post(&post)),
            PublishOutcome::AuthRequired => {
                format!("Sign in to publish.\n{}", self.describe_dialog())
            }
            PublishOutcome::NotReady => "The editor is still loading.".to_owned(),
            PublishOutcome::AlreadyPublishing => "Already publishing.".to_owned(),
            PublishOutcome::Empty => "Nothing to publish.".to_owned(),
            PublishOutcome::Abandoned => "The composer went away.".to_owned(),
            PublishOutcome::SessionEnded => "Your session ended; the post was dropped.".to_owned(),
        };
        Ok(message)
    }

    fn dispatch(&self, event: &UiEvent) -> String {
        match self.auth.dialog().handle(event) {
            DialogResponse::Ignored | DialogResponse::Handled => self.describe_dialog(),
            DialogResponse::Focus(element) => format!("Focus on {element}"),
            DialogResponse::Dismissed { restore_focus } => match restore_focus {
                Some(element) => format!("Dialog dismissed. Focus back on {element}."),
                None => "Dialog dismissed.".to_owned(),
            },
        }
    }

    fn describe_dialog(&self) -> String {
        let state = self.auth.dialog().state();
        if !state.is_open {
            return "Dialog closed.".to_owned();
        }
        match state.focused {
            Some(focused) => format!("Dialog open ({}), focus on {focused}", state.mode),
            None => format!("Dialog open ({})", state.mode),
        }
    }

    #[must_use]
    pub fn dialog_open(&self) -> bool {
        self.auth.dialog().is_open()
    }
}

fn describe_gate(gated: Gated<Notice>) -> String {
    match gated {
        Gated::Allowed(notice) => notice.to_string(),
        Gated::AuthRequired => "Sign in to continue.".to_owned(),
    }
}

fn render_post(post: &Post) -> String {
    let minutes = (UtcDateTime::now() - post.created_at).whole_minutes();
    let mut out = format!(
        "{} {} · {}m ago\n  {}\n  ♥ {}  💬 {}  ↗ {}",
        post.emoji, post.author.name, minutes, post.content, post.likes, post.comments, post.shares
    );
    if let Some(avatar) = &post.author.avatar {
        let _ = write!(out, "\n  {avatar}");
    }
    out
}

fn render_feed(posts: &[Post]) -> String {
    if posts.is_empty() {
        return "The feed is empty.".to_owned();
    }
    posts
        .iter()
        .enumerate()
        .map(|(index, post)| format!("[{}] {}", index + 1, render_post(post)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use crate::{
        app::{App, Flow},
        command::Command,
    };
    use murmur_client::{config::ClientConfig, session::store::MemoryStore};
    use std::sync::Arc;

    async fn run(app: &App, line: &str) -> String {
        let command: Command = line.parse().unwrap();
        let (flow, output) = app.execute(command).await.unwrap();
        assert_eq!(flow, Flow::Continue);
        output
    }

    #[tokio::test(start_paused = true)]
    async fn guest_is_prompted_then_publishes() {
        let app = App::new(ClientConfig::default(), Arc::new(MemoryStore::default()));
        let greeting = app.start().await.unwrap();
        assert!(greeting.starts_with("Browsing as a guest"));

        run(&app, "focus like-1").await;
        assert_eq!(run(&app, "like 1").await, "Sign in to continue.");
        assert!(app.dialog_open());

        assert_eq!(run(&app, "tab").await, "Focus on password");
        assert_eq!(
            run(&app, "login demo@example.com nope123").await,
            "Invalid email or password"
        );
        assert_eq!(
            run(&app, "login demo@example.com password123").await,
            "Signed in as Demo User. Focus back on like-1."
        );
        assert!(!app.dialog_open());

        assert_eq!(run(&app, "like 1").await, "Function not implemented");
        run(&app, "type hello").await;
        let published = run(&app, "publish").await;
        assert!(published.contains("<p>hello</p>"));
        assert!(run(&app, "feed").await.starts_with("[1] 😊 Demo User"));
    }

    #[tokio::test(start_paused = true)]
    async fn session_survives_restart() {
        let store = Arc::new(MemoryStore::default());
        let app = App::new(ClientConfig::default(), store.clone());
        app.start().await.unwrap();
        run(&app, "signup Ada Lovelace ada@example.com secret1").await;

        let restarted = App::new(ClientConfig::default(), store);
        assert_eq!(
            restarted.start().await.unwrap(),
            "Welcome back, Ada Lovelace."
        );
        assert!(run(&restarted, "whoami").await.starts_with("Ada Lovelace <ada@example.com>"));
    }

    #[tokio::test(start_paused = true)]
    async fn quit_and_errors() {
        let app = App::new(ClientConfig::default(), Arc::new(MemoryStore::default()));
        app.start().await.unwrap();

        assert!(app.execute(Command::Quit).await.unwrap().0 == Flow::Quit);
        assert!(app.execute("like 9".parse().unwrap()).await.is_err());
        assert_eq!(run(&app, "esc").await, "Dialog closed.");
    }
}
