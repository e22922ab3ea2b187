//! The document capability page behaviors are written against.
//!
//! Behaviors never reach for a global `window`/`document`. They receive an
//! `Arc<dyn Document>` and go through it for queries, class and attribute
//! edits, listeners, scrolling, and intersection observation.
//!
//! - [`Document`]: the capability trait
//! - [`Selector`]: the CSS selector subset used for queries
//! - [`events`]: events, listeners and their registry
//! - [`MemoryDocument`]: an in-memory document for tests and headless hosts
pub mod events;
pub mod memory;
pub mod selector;

use std::fmt;
use std::sync::Arc;

pub use events::{Event, EventKind, EventTarget, Listener, ListenerId};
pub use memory::MemoryDocument;
pub use selector::Selector;

/// Opaque handle to an element owned by a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "el#{}", self.0)
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("unsupported selector: {0}")]
    Selector(String),
    #[error("unknown element: {0}")]
    UnknownElement(ElementId),
    #[error("unknown intersection observer: {0:?}")]
    UnknownObserver(ObserverId),
    #[error("invalid tree operation: {0}")]
    Hierarchy(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollBehavior {
    #[default]
    Auto,
    Smooth,
}

/// Arguments of `window.scrollTo`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollToOptions {
    pub top: f64,
    pub behavior: ScrollBehavior,
}

/// Handle to an intersection observer created by a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub(crate) u64);

/// One observed element's intersection state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntersectionEntry {
    pub observer: ObserverId,
    pub target: ElementId,
    pub is_intersecting: bool,
}

pub type IntersectionCallback = Arc<dyn Fn(&[IntersectionEntry]) + Send + Sync>;

/// Browser document capability.
///
/// Implementations must not hold internal locks while invoking listeners or
/// intersection callbacks: callbacks are free to call back into the document.
pub trait Document: Send + Sync {
    /// Elements under `scope` (or the whole document) matching `selector`, in
    /// document order. The scope element itself is never included.
    fn query_selector_all(&self, scope: Option<ElementId>, selector: &Selector) -> Vec<ElementId>;

    fn query_selector(&self, scope: Option<ElementId>, selector: &Selector) -> Option<ElementId> {
        self.query_selector_all(scope, selector).into_iter().next()
    }

    fn element_by_id(&self, id: &str) -> Option<ElementId>;

    fn tag_name(&self, el: ElementId) -> Option<String>;

    fn attribute(&self, el: ElementId, name: &str) -> Option<String>;
    fn set_attribute(&self, el: ElementId, name: &str, value: &str) -> Result<(), DomError>;

    fn has_class(&self, el: ElementId, class: &str) -> bool;
    fn add_class(&self, el: ElementId, class: &str) -> Result<(), DomError>;
    fn remove_class(&self, el: ElementId, class: &str) -> Result<(), DomError>;

    /// Current value of a form control; `None` for elements without one.
    fn value(&self, el: ElementId) -> Option<String>;

    fn text_content(&self, el: ElementId) -> Option<String>;
    fn set_text_content(&self, el: ElementId, text: &str) -> Result<(), DomError>;

    /// Create a detached element.
    fn create_element(&self, tag: &str) -> ElementId;
    /// Insert `child` as the first child of `parent`.
    fn prepend_child(&self, parent: ElementId, child: ElementId) -> Result<(), DomError>;
    /// Detach `el` from its parent. Detaching a detached element is a no-op.
    fn remove_element(&self, el: ElementId) -> Result<(), DomError>;
    /// Whether `el` is attached to the document tree.
    fn is_connected(&self, el: ElementId) -> bool;

    /// Vertical scroll offset of the window (`window.pageYOffset`).
    fn scroll_y(&self) -> f64;
    fn scroll_to(&self, options: ScrollToOptions);

    fn add_event_listener(
        &self,
        target: EventTarget,
        kind: EventKind,
        listener: Listener,
    ) -> ListenerId;
    fn remove_event_listener(&self, id: ListenerId) -> bool;

    /// Create an intersection observer, or `None` when the host has no
    /// intersection observation support.
    fn create_intersection_observer(&self, callback: IntersectionCallback) -> Option<ObserverId>;
    fn observe(&self, observer: ObserverId, el: ElementId) -> Result<(), DomError>;
    fn unobserve(&self, observer: ObserverId, el: ElementId);
    fn disconnect_observer(&self, observer: ObserverId);
}
