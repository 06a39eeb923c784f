//! The modal authentication dialog: visibility, dismissal and focus containment.
//!
//! The controller is host-agnostic. The host forwards [`UiEvent`]s and applies the returned
//! [`DialogResponse`], for example by moving focus.

use parking_lot::Mutex;
use std::{
    collections::{BTreeSet, HashMap},
    fmt::{Display, Formatter},
    sync::Arc,
};
use tracing::debug;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub enum DialogMode {
    #[default]
    Login,
    Signup,
}

impl DialogMode {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            DialogMode::Login => DialogMode::Signup,
            DialogMode::Signup => DialogMode::Login,
        }
    }
}

impl Display for DialogMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DialogMode::Login => "login",
            DialogMode::Signup => "signup",
        })
    }
}

/// A focusable element of the host.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct ElementId(String);

impl ElementId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Display for ElementId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    #[must_use]
    pub fn contains(self, point: Point) -> bool {
        (self.x..self.x.saturating_add(self.width)).contains(&point.x)
            && (self.y..self.y.saturating_add(self.height)).contains(&point.y)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Key {
    Escape,
    Tab,
    Enter,
    Char(char),
    Other,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum UiEvent {
    KeyDown { key: Key, shift: bool },
    PointerDown(Point),
    FocusIn(ElementId),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum DialogResponse {
    /// The host handles the event as usual.
    Ignored,
    /// The event was consumed without any visible effect.
    Handled,
    /// The host should move focus to this element.
    Focus(ElementId),
    /// The dialog closed; focus goes back to the element that opened it, if any.
    Dismissed { restore_focus: Option<ElementId> },
}

/// Document-level listeners the dialog installs while open.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum ListenerKind {
    EscapeKey,
    OutsidePointer,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct DialogState {
    pub is_open: bool,
    pub mode: DialogMode,
    /// Element focused inside the dialog.
    pub focused: Option<ElementId>,
    /// Element that had focus when the dialog opened.
    pub trigger: Option<ElementId>,
}

#[derive(Debug, Default)]
struct DialogInner {
    state: DialogState,
    focus_orders: HashMap<DialogMode, Vec<ElementId>>,
    bounds: Option<Rect>,
    listeners: BTreeSet<ListenerKind>,
    page_focus: Option<ElementId>,
}

impl DialogInner {
    fn focus_order(&self) -> &[ElementId] {
        self.focus_orders
            .get(&self.state.mode)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn focus_first(&mut self) -> Option<ElementId> {
        self.state.focused = self.focus_order().first().cloned();
        self.state.focused.clone()
    }

    fn cycle_focus(&mut self, backwards: bool) -> Option<ElementId> {
        let order = self.focus_order();
        let len = order.len();
        if len == 0 {
            return None;
        }

        let current = self
            .state
            .focused
            .as_ref()
            .and_then(|focused| order.iter().position(|id| id == focused));
        let next = match (current, backwards) {
            (Some(index), false) => (index + 1) % len,
            (Some(index), true) => (index + len - 1) % len,
            (None, false) => 0,
            (None, true) => len - 1,
        };

        let next = order[next].clone();
        self.state.focused = Some(next.clone());
        Some(next)
    }

    fn close(&mut self) -> Option<ElementId> {
        self.listeners.clear();
        self.state.is_open = false;
        self.state.focused = None;
        self.state.trigger.take()
    }
}

/// Cloning yields another handle to the same dialog.
#[derive(Clone, Debug, Default)]
pub struct DialogController {
    inner: Arc<Mutex<DialogInner>>,
}

impl DialogController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The focusable elements of `mode`, in tab order.
    pub fn set_focus_order(&self, mode: DialogMode, order: Vec<ElementId>) {
        self.inner.lock().focus_orders.insert(mode, order);
    }

    /// Where the dialog is drawn; pointer presses outside dismiss it.
    ///
    /// Until bounds are set the dialog has no region, so every press counts as outside.
    pub fn set_bounds(&self, bounds: Rect) {
        self.inner.lock().bounds = Some(bounds);
    }

    /// Opens in `mode` and returns the element that receives initial focus.
    ///
    /// Opening an open dialog only switches its mode; the first trigger is kept.
    pub fn open(&self, mode: DialogMode, trigger: Option<ElementId>) -> Option<ElementId> {
        let mut inner = self.inner.lock();
        if !inner.state.is_open {
            inner.state.is_open = true;
            inner.state.trigger = trigger;
            inner
                .listeners
                .extend([ListenerKind::EscapeKey, ListenerKind::OutsidePointer]);
        }
        inner.state.mode = mode;
        debug!(%mode, "Dialog opened");

        inner.focus_first()
    }

    /// Opens with whatever last had focus on the page as the trigger.
    pub fn open_from_page(&self, mode: DialogMode) -> Option<ElementId> {
        let trigger = self.inner.lock().page_focus.clone();
        self.open(mode, trigger)
    }

    /// Closes the dialog and returns the element to restore focus to.
    pub fn close(&self) -> Option<ElementId> {
        let mut inner = self.inner.lock();
        if !inner.state.is_open {
            return None;
        }
        debug!("Dialog closed");
        inner.close()
    }

    /// Switches mode while open and returns the new initial focus.
    pub fn set_mode(&self, mode: DialogMode) -> Option<ElementId> {
        let mut inner = self.inner.lock();
        if !inner.state.is_open {
            return None;
        }
        inner.state.mode = mode;
        debug!(%mode, "Dialog mode switched");
        inner.focus_first()
    }

    pub fn switch_mode(&self) -> Option<ElementId> {
        let mode = self.mode().toggled();
        self.set_mode(mode)
    }

    pub fn handle(&self, event: &UiEvent) -> DialogResponse {
        let mut inner = self.inner.lock();
        if !inner.state.is_open {
            if let UiEvent::FocusIn(id) = event {
                inner.page_focus = Some(id.clone());
            }
            return DialogResponse::Ignored;
        }

        match event {
            UiEvent::KeyDown {
                key: Key::Escape, ..
            } if inner.listeners.contains(&ListenerKind::EscapeKey) => {
                debug!("Dialog dismissed with Escape");
                DialogResponse::Dismissed {
                    restore_focus: inner.close(),
                }
            }
            UiEvent::KeyDown {
                key: Key::Tab,
                shift,
            } => inner
                .cycle_focus(*shift)
                .map_or(DialogResponse::Handled, DialogResponse::Focus),
            UiEvent::KeyDown { .. } => DialogResponse::Ignored,
            UiEvent::PointerDown(point) => {
                let outside = inner.bounds.is_none_or(|bounds| !bounds.contains(*point));
                if outside && inner.listeners.contains(&ListenerKind::OutsidePointer) {
                    debug!("Dialog dismissed by outside press");
                    DialogResponse::Dismissed {
                        restore_focus: inner.close(),
                    }
                } else {
                    DialogResponse::Ignored
                }
            }
            UiEvent::FocusIn(id) => {
                if inner.focus_order().contains(id) {
                    inner.state.focused = Some(id.clone());
                    return DialogResponse::Ignored;
                }

                let target = match inner.state.focused.clone() {
                    Some(focused) => Some(focused),
                    None => inner.focus_first(),
                };
                target.map_or(DialogResponse::Handled, DialogResponse::Focus)
            }
        }
    }

    #[must_use]
    pub fn state(&self) -> DialogState {
        self.inner.lock().state.clone()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.lock().state.is_open
    }

    #[must_use]
    pub fn mode(&self) -> DialogMode {
        self.inner.lock().state.mode
    }

    #[must_use]
    pub fn focused(&self) -> Option<ElementId> {
        self.inner.lock().state.focused.clone()
    }

    /// Page scrolling is disabled exactly while the dialog is open.
    #[must_use]
    pub fn scroll_locked(&self) -> bool {
        self.is_open()
    }

    #[must_use]
    pub fn attached_listeners(&self) -> Vec<ListenerKind> {
        self.inner.lock().listeners.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::dialog::{
        DialogController, DialogMode, DialogResponse, ElementId, Key, ListenerKind, Point, Rect,
        UiEvent,
    };

    fn ids(names: &[&str]) -> Vec<ElementId> {
        names.iter().copied().map(ElementId::new).collect()
    }

    fn dialog() -> DialogController {
        let dialog = DialogController::new();
        dialog.set_focus_order(DialogMode::Login, ids(&["email", "password", "submit"]));
        dialog.set_focus_order(DialogMode::Signup, ids(&["name", "email", "password"]));
        dialog.set_bounds(Rect {
            x: 100,
            y: 100,
            width: 400,
            height: 300,
        });
        dialog
    }

    fn key(key: Key, shift: bool) -> UiEvent {
        UiEvent::KeyDown { key, shift }
    }

    #[test]
    fn listeners_only_while_open() {
        let dialog = dialog();
        assert!(dialog.attached_listeners().is_empty());
        assert!(!dialog.scroll_locked());

        dialog.open(DialogMode::Login, None);
        assert_eq!(
            dialog.attached_listeners(),
            [ListenerKind::EscapeKey, ListenerKind::OutsidePointer]
        );
        assert!(dialog.scroll_locked());

        dialog.close();
        assert!(dialog.attached_listeners().is_empty());
        assert!(!dialog.scroll_locked());
    }

    #[test]
    fn escape_dismisses_and_restores_focus() {
        let dialog = dialog();
        let trigger = ElementId::new("like-button");

        assert_eq!(
            dialog.open(DialogMode::Login, Some(trigger.clone())),
            Some(ElementId::new("email"))
        );
        assert_eq!(
            dialog.handle(&key(Key::Escape, false)),
            DialogResponse::Dismissed {
                restore_focus: Some(trigger)
            }
        );
        assert!(!dialog.is_open());

        assert_eq!(
            dialog.handle(&key(Key::Escape, false)),
            DialogResponse::Ignored
        );
        assert_eq!(dialog.close(), None);
    }

    #[test]
    fn outside_press_dismisses() {
        let dialog = dialog();
        dialog.open(DialogMode::Login, None);

        assert_eq!(
            dialog.handle(&UiEvent::PointerDown(Point { x: 200, y: 200 })),
            DialogResponse::Ignored
        );
        assert!(dialog.is_open());

        assert_eq!(
            dialog.handle(&UiEvent::PointerDown(Point { x: 50, y: 200 })),
            DialogResponse::Dismissed {
                restore_focus: None
            }
        );
        assert!(!dialog.is_open());
    }

    #[test]
    fn any_press_dismisses_without_bounds() {
        let dialog = DialogController::new();
        dialog.open(DialogMode::Login, None);

        assert_eq!(
            dialog.handle(&UiEvent::PointerDown(Point { x: 0, y: 0 })),
            DialogResponse::Dismissed {
                restore_focus: None
            }
        );
        assert!(!dialog.is_open());
    }

    #[test]
    fn huge_bounds_saturate() {
        let bounds = Rect {
            x: i32::MAX - 10,
            y: i32::MAX - 10,
            width: i32::MAX,
            height: i32::MAX,
        };

        assert!(bounds.contains(Point {
            x: i32::MAX - 1,
            y: i32::MAX - 5,
        }));
        assert!(!bounds.contains(Point { x: 0, y: 0 }));
    }

    #[test]
    fn tab_cycles_within_the_dialog() {
        let dialog = dialog();
        dialog.open(DialogMode::Login, None);

        let forward: Vec<_> = (0..3)
            .map(|_| dialog.handle(&key(Key::Tab, false)))
            .collect();
        assert_eq!(
            forward,
            [
                DialogResponse::Focus(ElementId::new("password")),
                DialogResponse::Focus(ElementId::new("submit")),
                DialogResponse::Focus(ElementId::new("email")),
            ]
        );

        assert_eq!(
            dialog.handle(&key(Key::Tab, true)),
            DialogResponse::Focus(ElementId::new("submit"))
        );
        assert_eq!(dialog.focused(), Some(ElementId::new("submit")));
    }

    #[test]
    fn focus_escaping_the_dialog_is_pulled_back() {
        let dialog = dialog();
        dialog.open(DialogMode::Login, None);
        dialog.handle(&UiEvent::FocusIn(ElementId::new("password")));

        assert_eq!(
            dialog.handle(&UiEvent::FocusIn(ElementId::new("search"))),
            DialogResponse::Focus(ElementId::new("password"))
        );
        assert_eq!(
            dialog.handle(&key(Key::Char('a'), false)),
            DialogResponse::Ignored
        );
    }

    #[test]
    fn switching_mode_moves_focus() {
        let dialog = dialog();
        assert_eq!(dialog.switch_mode(), None);
        assert_eq!(dialog.mode(), DialogMode::Login);

        dialog.open(DialogMode::Login, None);
        assert_eq!(dialog.switch_mode(), Some(ElementId::new("name")));
        assert_eq!(dialog.mode(), DialogMode::Signup);
        assert_eq!(
            dialog.handle(&key(Key::Tab, true)),
            DialogResponse::Focus(ElementId::new("password"))
        );
    }

    #[test]
    fn page_focus_becomes_the_trigger() {
        let dialog = dialog();
        dialog.handle(&UiEvent::FocusIn(ElementId::new("publish")));

        dialog.open_from_page(DialogMode::Signup);
        assert_eq!(dialog.state().trigger, Some(ElementId::new("publish")));

        // Reopening keeps the first trigger.
        dialog.open(DialogMode::Login, Some(ElementId::new("other")));
        assert_eq!(dialog.close(), Some(ElementId::new("publish")));
    }
}
