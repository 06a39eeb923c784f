//! A self-contained rich-text editor that keeps its document in memory.

use crate::composer::engine::{
    ContainerId, EngineConfig, EngineError, EngineEvent, EngineEventKind, EngineRuntime,
    EventHandler, Format, FormatSet, RichTextEngine, SubscriptionId,
};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    fmt::{Debug, Formatter, Write},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tracing::debug;

/// Marks rendered inline, in nesting order.
const INLINE_MARKS: [(Format, &str); 4] = [
    (Format::Bold, "strong"),
    (Format::Italic, "em"),
    (Format::Underline, "u"),
    (Format::Strike, "s"),
];

/// Hands out [`MemoryEngine`]s, at most one live editor per container.
#[derive(Default)]
pub struct MemoryRuntime {
    engines: Mutex<HashMap<ContainerId, MemoryEngine>>,
    constructed: AtomicUsize,
}

impl MemoryRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The editor most recently bound to `container`, for driving it like a user would.
    #[must_use]
    pub fn engine(&self, container: &ContainerId) -> Option<MemoryEngine> {
        self.engines.lock().get(container).cloned()
    }

    /// How many editors were ever constructed.
    #[must_use]
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }
}

impl EngineRuntime for MemoryRuntime {
    fn construct(
        &self,
        container: &ContainerId,
        config: &EngineConfig,
    ) -> Result<Box<dyn RichTextEngine>, EngineError> {
        let mut engines = self.engines.lock();
        if engines
            .get(container)
            .is_some_and(|engine| !engine.is_detached())
        {
            return Err(EngineError::ContainerInUse(container.clone()));
        }

        let engine = MemoryEngine::new(config);
        engines.insert(container.clone(), engine.clone());
        self.constructed.fetch_add(1, Ordering::SeqCst);
        debug!(%container, "Constructed editor");

        Ok(Box::new(engine))
    }
}

impl Debug for MemoryRuntime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRuntime")
            .field("containers", &self.engines.lock().len())
            .field("constructed", &self.constructed())
            .finish()
    }
}

#[derive(Clone, Eq, PartialEq, Debug)]
struct Run {
    text: String,
    formats: FormatSet,
}

#[derive(Debug)]
struct Document {
    runs: Vec<Run>,
    cursor_formats: FormatSet,
    allowed: Vec<Format>,
    placeholder: String,
    focused: bool,
    detached: bool,
}

impl Document {
    fn text(&self) -> String {
        let mut text: String = self.runs.iter().map(|run| run.text.as_str()).collect();
        text.push('\n');
        text
    }

    fn insert(&mut self, text: &str) {
        match self.runs.last_mut() {
            Some(last) if last.formats == self.cursor_formats => last.text.push_str(text),
            _ => self.runs.push(Run {
                text: text.to_owned(),
                formats: self.cursor_formats.clone(),
            }),
        }
    }

    fn markup(&self) -> String {
        let mut paragraphs = vec![String::new()];
        for run in &self.runs {
            for (index, segment) in run.text.split('\n').enumerate() {
                if index > 0 {
                    paragraphs.push(String::new());
                }
                if let Some(paragraph) = paragraphs.last_mut() {
                    write_segment(paragraph, segment, &run.formats);
                }
            }
        }

        let mut markup = String::new();
        for paragraph in paragraphs {
            let body = if paragraph.is_empty() { "<br>" } else { &paragraph };
            let _ = write!(markup, "<p>{body}</p>");
        }
        markup
    }
}

fn write_segment(out: &mut String, segment: &str, formats: &FormatSet) {
    if segment.is_empty() {
        return;
    }
    let marks: Vec<&str> = INLINE_MARKS
        .iter()
        .filter(|(format, _)| formats.contains(format))
        .map(|(_, tag)| *tag)
        .collect();

    for tag in &marks {
        let _ = write!(out, "<{tag}>");
    }
    escape_html(out, segment);
    for tag in marks.iter().rev() {
        let _ = write!(out, "</{tag}>");
    }
}

fn escape_html(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

#[derive(Default)]
struct Listeners {
    next_id: u64,
    handlers: Vec<(SubscriptionId, EngineEventKind, EventHandler)>,
}

struct Shared {
    document: Mutex<Document>,
    listeners: Mutex<Listeners>,
}

/// Handle to one in-memory editor. Clones drive the same document.
///
/// Only the inline marks bold, italic, underline and strike are rendered; block formats are
/// tracked at the cursor but do not change the markup.
#[derive(Clone)]
pub struct MemoryEngine {
    shared: Arc<Shared>,
}

impl MemoryEngine {
    fn new(config: &EngineConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                document: Mutex::new(Document {
                    runs: Vec::new(),
                    cursor_formats: FormatSet::new(),
                    allowed: config.formats.clone(),
                    placeholder: config.placeholder.clone(),
                    focused: false,
                    detached: false,
                }),
                listeners: Mutex::new(Listeners::default()),
            }),
        }
    }

    /// Inserts `text` at the end of the document with the formats active at the cursor.
    pub fn type_text(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        let text = {
            let mut document = self.shared.document.lock();
            document.insert(text);
            document.text()
        };
        self.emit(&EngineEvent::TextChange { text });
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.shared.document.lock().text()
    }

    #[must_use]
    pub fn formats(&self) -> FormatSet {
        self.shared.document.lock().cursor_formats.clone()
    }

    #[must_use]
    pub fn html(&self) -> String {
        self.shared.document.lock().markup()
    }

    #[must_use]
    pub fn placeholder(&self) -> String {
        self.shared.document.lock().placeholder.clone()
    }

    #[must_use]
    pub fn is_focused(&self) -> bool {
        self.shared.document.lock().focused
    }

    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.shared.document.lock().detached
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.shared.listeners.lock().handlers.len()
    }

    fn emit(&self, event: &EngineEvent) {
        let kind = event.kind();
        let handlers: Vec<EventHandler> = self
            .shared
            .listeners
            .lock()
            .handlers
            .iter()
            .filter(|(_, handler_kind, _)| *handler_kind == kind)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();

        for handler in handlers {
            handler(event);
        }
    }
}

impl RichTextEngine for MemoryEngine {
    fn plain_text(&self) -> String {
        self.text()
    }

    fn current_format(&self) -> FormatSet {
        self.formats()
    }

    fn set_format(&mut self, format: Format, enabled: bool) -> Result<(), EngineError> {
        let formats = {
            let mut document = self.shared.document.lock();
            if !document.allowed.contains(&format) {
                return Err(EngineError::FormatNotAllowed(format));
            }
            if enabled {
                document.cursor_formats.insert(format);
            } else {
                document.cursor_formats.remove(&format);
            }
            document.cursor_formats.clone()
        };
        self.emit(&EngineEvent::SelectionChange { formats });
        Ok(())
    }

    fn clear_contents(&mut self) {
        let text = {
            let mut document = self.shared.document.lock();
            document.runs.clear();
            document.text()
        };
        self.emit(&EngineEvent::TextChange { text });
    }

    fn markup(&self) -> String {
        self.html()
    }

    fn focus(&mut self) {
        self.shared.document.lock().focused = true;
    }

    fn subscribe(&mut self, kind: EngineEventKind, handler: EventHandler) -> SubscriptionId {
        let mut listeners = self.shared.listeners.lock();
        let id = SubscriptionId(listeners.next_id);
        listeners.next_id += 1;
        listeners.handlers.push((id, kind, handler));
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.shared
            .listeners
            .lock()
            .handlers
            .retain(|(handler_id, _, _)| *handler_id != id);
    }

    fn detach(&mut self) {
        {
            let mut document = self.shared.document.lock();
            document.detached = true;
            document.focused = false;
        }
        self.shared.listeners.lock().handlers.clear();
    }
}

impl Debug for MemoryEngine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("document", &*self.shared.document.lock())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::composer::{
        engine::{
            ContainerId, EngineConfig, EngineError, EngineEvent, EngineEventKind, EngineRuntime,
            Format, RichTextEngine,
        },
        memory::MemoryRuntime,
    };
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn construct() -> (MemoryRuntime, ContainerId, Box<dyn RichTextEngine>) {
        let runtime = MemoryRuntime::new();
        let container = ContainerId::new("post-editor");
        let engine = runtime
            .construct(&container, &EngineConfig::composer("Say something"))
            .unwrap();
        (runtime, container, engine)
    }

    #[test]
    fn empty_document() {
        let (runtime, container, engine) = construct();

        assert_eq!(engine.plain_text(), "\n");
        assert_eq!(engine.markup(), "<p><br></p>");
        assert!(engine.current_format().is_empty());
        assert_eq!(runtime.engine(&container).unwrap().placeholder(), "Say something");
    }

    #[test]
    fn renders_marks_and_escapes_text() {
        let (runtime, container, mut engine) = construct();
        let handle = runtime.engine(&container).unwrap();

        handle.type_text("a < b & ");
        engine.set_format(Format::Bold, true).unwrap();
        engine.set_format(Format::Italic, true).unwrap();
        handle.type_text("\"loud\"");
        engine.set_format(Format::Bold, false).unwrap();
        handle.type_text("\n\nnext");

        assert_eq!(engine.plain_text(), "a < b & \"loud\"\n\nnext\n");
        assert_eq!(
            engine.markup(),
            "<p>a &lt; b &amp; <strong><em>&quot;loud&quot;</em></strong></p>\
             <p><br></p><p><em>next</em></p>"
        );
    }

    #[test]
    fn rejects_formats_outside_the_allow_list() {
        let runtime = MemoryRuntime::new();
        let config = EngineConfig {
            formats: vec![Format::Bold],
            ..EngineConfig::composer("")
        };
        let mut engine = runtime
            .construct(&ContainerId::new("restricted"), &config)
            .unwrap();

        assert_eq!(
            engine.set_format(Format::Strike, true),
            Err(EngineError::FormatNotAllowed(Format::Strike))
        );
        assert!(engine.current_format().is_empty());
    }

    #[test]
    fn events_reach_subscribers_until_unsubscribed() {
        let (runtime, container, mut engine) = construct();
        let handle = runtime.engine(&container).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let id = engine.subscribe(EngineEventKind::TextChange, {
            let seen = Arc::clone(&seen);
            Arc::new(move |event: &EngineEvent| seen.lock().push(event.clone()))
        });
        handle.type_text("hi");
        engine.set_format(Format::Underline, true).unwrap();
        engine.clear_contents();
        engine.unsubscribe(id);
        handle.type_text("ignored");

        assert_eq!(
            *seen.lock(),
            vec![
                EngineEvent::TextChange {
                    text: "hi\n".to_owned()
                },
                EngineEvent::TextChange {
                    text: "\n".to_owned()
                },
            ]
        );
    }

    #[test]
    fn handlers_may_call_back_into_the_engine() {
        let (runtime, container, mut engine) = construct();
        let handle = runtime.engine(&container).unwrap();
        let observed = Arc::new(Mutex::new(String::new()));

        engine.subscribe(EngineEventKind::TextChange, {
            let handle = handle.clone();
            let observed = Arc::clone(&observed);
            Arc::new(move |_: &EngineEvent| *observed.lock() = handle.html())
        });
        handle.type_text("x");

        assert_eq!(*observed.lock(), "<p>x</p>");
    }

    #[test]
    fn one_live_editor_per_container() {
        let (runtime, container, mut engine) = construct();
        let config = EngineConfig::composer("");

        assert!(matches!(
            runtime.construct(&container, &config),
            Err(EngineError::ContainerInUse(_))
        ));

        engine.detach();
        assert!(runtime.construct(&container, &config).is_ok());
        assert_eq!(runtime.constructed(), 2);
    }
}
