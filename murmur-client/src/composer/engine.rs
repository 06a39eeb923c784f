//! The boundary between the composer and an embeddable rich-text editor.
//!
//! Any editor offering these capabilities can back a composer; the in-memory implementation in
//! [`crate::composer::memory`] is one.

use std::{
    collections::BTreeSet,
    fmt::{Display, Formatter},
    str::FromStr,
    sync::Arc,
};
use thiserror::Error;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Format {
    Bold,
    Italic,
    Underline,
    Strike,
    Header,
    List,
    Link,
}

pub type FormatSet = BTreeSet<Format>;

impl Format {
    /// Marks the composer toolbar can toggle.
    pub const TOOLBAR: [Format; 4] = [
        Format::Bold,
        Format::Italic,
        Format::Underline,
        Format::Strike,
    ];

    /// Everything the composer allows the editor to produce.
    pub const ALLOWED: [Format; 7] = [
        Format::Bold,
        Format::Italic,
        Format::Underline,
        Format::Strike,
        Format::Header,
        Format::List,
        Format::Link,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Format::Bold => "bold",
            Format::Italic => "italic",
            Format::Underline => "underline",
            Format::Strike => "strike",
            Format::Header => "header",
            Format::List => "list",
            Format::Link => "link",
        }
    }

    #[must_use]
    pub fn is_toolbar_mark(self) -> bool {
        Self::TOOLBAR.contains(&self)
    }
}

impl Display for Format {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown format: {0:?}")]
pub struct UnknownFormatError(String);

impl FromStr for Format {
    type Err = UnknownFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALLOWED
            .into_iter()
            .find(|format| format.name() == s)
            .ok_or_else(|| UnknownFormatError(s.to_owned()))
    }
}

/// Identifies the element an editor instance is bound to.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct ContainerId(String);

impl ContainerId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Display for ContainerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct EngineConfig {
    /// Whether the editor draws its own toolbar.
    pub toolbar: bool,
    pub formats: Vec<Format>,
    pub placeholder: String,
}

impl EngineConfig {
    /// Host-supplied toolbar, the composer's format allow-list and the given placeholder.
    #[must_use]
    pub fn composer(placeholder: impl Into<String>) -> Self {
        Self {
            toolbar: false,
            formats: Format::ALLOWED.to_vec(),
            placeholder: placeholder.into(),
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum EngineEventKind {
    TextChange,
    SelectionChange,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum EngineEvent {
    TextChange { text: String },
    SelectionChange { formats: FormatSet },
}

impl EngineEvent {
    #[must_use]
    pub fn kind(&self) -> EngineEventKind {
        match self {
            EngineEvent::TextChange { .. } => EngineEventKind::TextChange,
            EngineEvent::SelectionChange { .. } => EngineEventKind::SelectionChange,
        }
    }
}

pub type EventHandler = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct SubscriptionId(pub u64);

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum EngineError {
    #[error("Container {0} already hosts an editor")]
    ContainerInUse(ContainerId),
    #[error("Format {0} is not enabled for this editor")]
    FormatNotAllowed(Format),
}

pub trait RichTextEngine: Send {
    /// The document as plain text, including any trailing newline the editor keeps.
    fn plain_text(&self) -> String;
    /// Formats active at the current selection.
    fn current_format(&self) -> FormatSet;
    fn set_format(&mut self, format: Format, enabled: bool) -> Result<(), EngineError>;
    /// Replaces the contents with an empty document.
    fn clear_contents(&mut self);
    /// The document serialized as sanitized HTML.
    fn markup(&self) -> String;
    fn focus(&mut self);
    fn subscribe(&mut self, kind: EngineEventKind, handler: EventHandler) -> SubscriptionId;
    fn unsubscribe(&mut self, id: SubscriptionId);
    /// Releases the container so another editor may bind to it.
    fn detach(&mut self) {}
}

pub trait EngineRuntime: Send + Sync {
    fn construct(
        &self,
        container: &ContainerId,
        config: &EngineConfig,
    ) -> Result<Box<dyn RichTextEngine>, EngineError>;
}
