use std::sync::Arc;

use crate::ElementId;

/// The browser events page behaviors subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Scroll,
    Click,
    Submit,
    Input,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Scroll => "scroll",
            EventKind::Click => "click",
            EventKind::Submit => "submit",
            EventKind::Input => "input",
        }
    }

    /// Whether the event travels from its target up through the ancestors.
    pub fn bubbles(&self) -> bool {
        !matches!(self, EventKind::Scroll)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Window,
    Element(ElementId),
}

/// A dispatched event. Listeners may cancel the default action or stop
/// propagation.
#[derive(Debug, Clone)]
pub struct Event {
    kind: EventKind,
    target: EventTarget,
    current_target: EventTarget,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl Event {
    pub fn new(kind: EventKind, target: EventTarget) -> Self {
        Self {
            kind,
            target,
            current_target: target,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn target(&self) -> EventTarget {
        self.target
    }

    /// Target element, if the event was not dispatched on the window.
    pub fn target_element(&self) -> Option<ElementId> {
        match self.target {
            EventTarget::Element(el) => Some(el),
            EventTarget::Window => None,
        }
    }

    pub fn current_target(&self) -> EventTarget {
        self.current_target
    }

    pub fn set_current_target(&mut self, target: EventTarget) {
        self.current_target = target;
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Event listener callback.
pub type Listener = Arc<dyn Fn(&mut Event) + Send + Sync>;

/// Handle for removing a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// Listener bookkeeping shared by document implementations.
#[derive(Default)]
pub struct ListenerRegistry {
    next: u64,
    entries: Vec<(ListenerId, EventTarget, EventKind, Listener)>,
}

impl ListenerRegistry {
    pub fn add(&mut self, target: EventTarget, kind: EventKind, listener: Listener) -> ListenerId {
        self.next += 1;
        let id = ListenerId(self.next);
        self.entries.push((id, target, kind, listener));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(lid, ..)| *lid != id);
        self.entries.len() != before
    }

    /// Listeners for `kind` on `target`, in registration order.
    pub fn matching(&self, target: EventTarget, kind: EventKind) -> Vec<Listener> {
        self.entries
            .iter()
            .filter(|(_, t, k, _)| *t == target && *k == kind)
            .map(|(.., l)| l.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
