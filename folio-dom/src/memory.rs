//! In-memory [`Document`] used by tests and headless hosts.
//!
//! The tree is an arena of element nodes keyed by [`ElementId`]. Beyond the
//! trait surface it exposes driver methods (`click`, `submit`, `type_text`,
//! `scroll_window_to`, `set_in_viewport`) that dispatch events the way a
//! browser would, plus inspection helpers for assertions.
//!
//! Simplifications: `scroll_to` jumps immediately (a smooth scroll "finishes"
//! at once and fires a single scroll event), and intersection entries are
//! delivered synchronously instead of on the next frame.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::events::ListenerRegistry;
use crate::selector::Subject;
use crate::{
    Document, DomError, ElementId, Event, EventKind, EventTarget, IntersectionCallback,
    IntersectionEntry, Listener, ListenerId, ObserverId, ScrollToOptions, Selector,
};

const FORM_CONTROLS: [&str; 3] = ["input", "textarea", "select"];

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attrs: Vec<(String, String)>,
    value: Option<String>,
    text: String,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

impl Subject for Node {
    fn tag_name(&self) -> &str {
        &self.tag
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl Node {
    fn new(tag: &str) -> Self {
        let tag = tag.to_ascii_lowercase();
        let value = FORM_CONTROLS.contains(&tag.as_str()).then(String::new);
        Self {
            tag,
            attrs: Vec::new(),
            value,
            text: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    fn set_attr(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((name, value.to_string())),
        }
    }

    fn classes(&self) -> Vec<String> {
        self.attribute("class")
            .map(|list| list.split_ascii_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

struct Observer {
    callback: IntersectionCallback,
    targets: Vec<ElementId>,
}

struct State {
    nodes: Vec<Node>,
    root: ElementId,
    body: ElementId,
    scroll_y: f64,
    scroll_requests: Vec<ScrollToOptions>,
    listeners: ListenerRegistry,
    intersection_supported: bool,
    observers: HashMap<ObserverId, Observer>,
    next_observer: u64,
    in_viewport: HashSet<ElementId>,
    submissions: Vec<ElementId>,
}

impl State {
    fn node(&self, el: ElementId) -> Result<&Node, DomError> {
        self.nodes
            .get(el.0 as usize)
            .ok_or(DomError::UnknownElement(el))
    }

    fn node_mut(&mut self, el: ElementId) -> Result<&mut Node, DomError> {
        self.nodes
            .get_mut(el.0 as usize)
            .ok_or(DomError::UnknownElement(el))
    }

    fn alloc(&mut self, tag: &str) -> ElementId {
        let id = ElementId(self.nodes.len() as u64);
        self.nodes.push(Node::new(tag));
        id
    }

    fn detach(&mut self, el: ElementId) -> Result<(), DomError> {
        let parent = self.node(el)?.parent;
        if let Some(p) = parent {
            self.node_mut(p)?.children.retain(|c| *c != el);
            self.node_mut(el)?.parent = None;
        }
        Ok(())
    }

    fn is_ancestor_or_self(&self, candidate: ElementId, of: ElementId) -> bool {
        let mut cur = Some(of);
        while let Some(el) = cur {
            if el == candidate {
                return true;
            }
            cur = self.nodes.get(el.0 as usize).and_then(|n| n.parent);
        }
        false
    }

    fn is_connected(&self, el: ElementId) -> bool {
        let mut cur = Some(el);
        while let Some(id) = cur {
            if id == self.root {
                return true;
            }
            cur = self.nodes.get(id.0 as usize).and_then(|n| n.parent);
        }
        false
    }

    /// Pre-order descendants of `scope`, excluding `scope` itself.
    fn descendants(&self, scope: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = self
            .nodes
            .get(scope.0 as usize)
            .map(|n| n.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(el) = stack.pop() {
            out.push(el);
            if let Some(n) = self.nodes.get(el.0 as usize) {
                stack.extend(n.children.iter().rev().copied());
            }
        }
        out
    }

    /// Dispatch path: target, its ancestors, then the window.
    fn propagation_path(&self, ev: &Event) -> Vec<EventTarget> {
        match ev.target() {
            EventTarget::Window => vec![EventTarget::Window],
            EventTarget::Element(el) if !ev.kind().bubbles() => vec![EventTarget::Element(el)],
            EventTarget::Element(el) => {
                let mut path = Vec::new();
                let mut cur = Some(el);
                while let Some(id) = cur {
                    path.push(EventTarget::Element(id));
                    cur = self.nodes.get(id.0 as usize).and_then(|n| n.parent);
                }
                if self.is_connected(el) {
                    path.push(EventTarget::Window);
                }
                path
            }
        }
    }
}

/// In-memory document with a `<html><body>` skeleton.
pub struct MemoryDocument {
    state: Mutex<State>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// Empty document that supports intersection observation.
    ///
    /// ```
    /// use folio_dom::{Document, MemoryDocument, Selector};
    ///
    /// let doc = MemoryDocument::new();
    /// let img = doc
    ///     .append_element(doc.body(), "img", &[("class", "lazy"), ("data-src", "x.png")])
    ///     .unwrap();
    /// let found = doc.query_selector(None, &Selector::parse("img.lazy").unwrap());
    /// assert_eq!(found, Some(img));
    /// ```
    pub fn new() -> Self {
        let mut state = State {
            nodes: Vec::new(),
            root: ElementId(0),
            body: ElementId(0),
            scroll_y: 0.0,
            scroll_requests: Vec::new(),
            listeners: ListenerRegistry::default(),
            intersection_supported: true,
            observers: HashMap::new(),
            next_observer: 0,
            in_viewport: HashSet::new(),
            submissions: Vec::new(),
        };
        let root = state.alloc("html");
        let body = state.alloc("body");
        state.nodes[body.0 as usize].parent = Some(root);
        state.nodes[root.0 as usize].children.push(body);
        state.root = root;
        state.body = body;
        Self {
            state: Mutex::new(state),
        }
    }

    /// Document whose host lacks intersection observation.
    pub fn without_intersection_observer() -> Self {
        let doc = Self::new();
        doc.state().intersection_supported = false;
        doc
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn body(&self) -> ElementId {
        self.state().body
    }

    /// Create an element with `attrs` and append it to `parent`.
    pub fn append_element(
        &self,
        parent: ElementId,
        tag: &str,
        attrs: &[(&str, &str)],
    ) -> Result<ElementId, DomError> {
        let mut st = self.state();
        st.node(parent)?;
        let el = st.alloc(tag);
        let node = st.node_mut(el)?;
        for (k, v) in attrs {
            node.set_attr(k, v);
        }
        if node.tag == "input" {
            if let Some(initial) = node.attribute("value").map(str::to_string) {
                node.value = Some(initial);
            }
        }
        node.parent = Some(parent);
        st.node_mut(parent)?.children.push(el);
        Ok(el)
    }

    pub fn children(&self, el: ElementId) -> Vec<ElementId> {
        self.state()
            .node(el)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn classes(&self, el: ElementId) -> Vec<String> {
        self.state()
            .node(el)
            .map(Node::classes)
            .unwrap_or_default()
    }

    /// Set a form control's value without dispatching events.
    pub fn set_value(&self, el: ElementId, value: &str) -> Result<(), DomError> {
        let mut st = self.state();
        let node = st.node_mut(el)?;
        match node.value.as_mut() {
            Some(v) => {
                *v = value.to_string();
                Ok(())
            }
            None => Err(DomError::Hierarchy(format!(
                "<{}> has no value to set",
                node.tag
            ))),
        }
    }

    /// Replace a control's value and fire `input`, as typing would.
    pub fn type_text(&self, el: ElementId, value: &str) -> Result<Event, DomError> {
        self.set_value(el, value)?;
        Ok(self.dispatch(Event::new(EventKind::Input, EventTarget::Element(el))))
    }

    pub fn click(&self, el: ElementId) -> Event {
        self.dispatch(Event::new(EventKind::Click, EventTarget::Element(el)))
    }

    /// Fire `submit` on a form. If no listener cancels it, the native
    /// submission is recorded (see [`MemoryDocument::submissions`]).
    pub fn submit(&self, form: ElementId) -> Event {
        let ev = self.dispatch(Event::new(EventKind::Submit, EventTarget::Element(form)));
        if !ev.default_prevented() {
            self.state().submissions.push(form);
        }
        ev
    }

    /// Move the viewport as a user would, firing `scroll` on the window.
    pub fn scroll_window_to(&self, y: f64) -> Event {
        self.state().scroll_y = y.max(0.0);
        self.dispatch(Event::new(EventKind::Scroll, EventTarget::Window))
    }

    /// Run listeners along the propagation path. No lock is held while a
    /// listener runs.
    pub fn dispatch(&self, mut ev: Event) -> Event {
        let path = self.state().propagation_path(&ev);
        tracing::trace!(target: "dom", kind = ev.kind().as_str(), hops = path.len(), "dispatch");
        for current in path {
            ev.set_current_target(current);
            let listeners = self.state().listeners.matching(current, ev.kind());
            for listener in listeners {
                listener(&mut ev);
            }
            if ev.propagation_stopped() {
                break;
            }
        }
        ev
    }

    /// Mark `el` as (not) intersecting the viewport and notify observers
    /// watching it when the state changes.
    pub fn set_in_viewport(&self, el: ElementId, visible: bool) {
        let deliveries: Vec<(IntersectionCallback, IntersectionEntry)> = {
            let mut st = self.state();
            let changed = if visible {
                st.in_viewport.insert(el)
            } else {
                st.in_viewport.remove(&el)
            };
            if !changed {
                return;
            }
            let mut ids: Vec<_> = st
                .observers
                .iter()
                .filter(|(_, o)| o.targets.contains(&el))
                .map(|(id, o)| (*id, o.callback.clone()))
                .collect();
            ids.sort_by_key(|(id, _)| *id);
            ids.into_iter()
                .map(|(observer, cb)| {
                    (
                        cb,
                        IntersectionEntry {
                            observer,
                            target: el,
                            is_intersecting: visible,
                        },
                    )
                })
                .collect()
        };
        for (cb, entry) in deliveries {
            cb(&[entry]);
        }
    }

    pub fn scroll_requests(&self) -> Vec<ScrollToOptions> {
        self.state().scroll_requests.clone()
    }

    /// Forms whose submission went ahead natively, in order.
    pub fn submissions(&self) -> Vec<ElementId> {
        self.state().submissions.clone()
    }

    pub fn listener_count(&self) -> usize {
        self.state().listeners.len()
    }

    pub fn observed_targets(&self, observer: ObserverId) -> Vec<ElementId> {
        self.state()
            .observers
            .get(&observer)
            .map(|o| o.targets.clone())
            .unwrap_or_default()
    }

    pub fn observer_count(&self) -> usize {
        self.state().observers.len()
    }
}

impl Document for MemoryDocument {
    fn query_selector_all(&self, scope: Option<ElementId>, selector: &Selector) -> Vec<ElementId> {
        let st = self.state();
        let candidates = match scope {
            Some(el) => st.descendants(el),
            None => {
                let mut all = vec![st.root];
                all.extend(st.descendants(st.root));
                all
            }
        };
        let nodes = &st.nodes;
        candidates
            .into_iter()
            .filter(|el| {
                nodes.get(el.0 as usize).is_some_and(|node| {
                    selector.matches(node, |n| n.parent.and_then(|p| nodes.get(p.0 as usize)))
                })
            })
            .collect()
    }

    fn element_by_id(&self, id: &str) -> Option<ElementId> {
        let st = self.state();
        std::iter::once(st.root)
            .chain(st.descendants(st.root))
            .find(|el| st.node(*el).ok().and_then(|n| n.attribute("id")) == Some(id))
    }

    fn tag_name(&self, el: ElementId) -> Option<String> {
        self.state().node(el).ok().map(|n| n.tag.clone())
    }

    fn attribute(&self, el: ElementId, name: &str) -> Option<String> {
        self.state()
            .node(el)
            .ok()
            .and_then(|n| n.attribute(name).map(str::to_string))
    }

    fn set_attribute(&self, el: ElementId, name: &str, value: &str) -> Result<(), DomError> {
        self.state().node_mut(el)?.set_attr(name, value);
        Ok(())
    }

    fn has_class(&self, el: ElementId, class: &str) -> bool {
        self.state()
            .node(el)
            .map(|n| n.has_class(class))
            .unwrap_or(false)
    }

    fn add_class(&self, el: ElementId, class: &str) -> Result<(), DomError> {
        let mut st = self.state();
        let node = st.node_mut(el)?;
        let mut classes = node.classes();
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
            node.set_attr("class", &classes.join(" "));
        }
        Ok(())
    }

    fn remove_class(&self, el: ElementId, class: &str) -> Result<(), DomError> {
        let mut st = self.state();
        let node = st.node_mut(el)?;
        if node.attribute("class").is_some() {
            let remaining: Vec<String> = node.classes().into_iter().filter(|c| c != class).collect();
            node.set_attr("class", &remaining.join(" "));
        }
        Ok(())
    }

    fn value(&self, el: ElementId) -> Option<String> {
        self.state().node(el).ok().and_then(|n| n.value.clone())
    }

    fn text_content(&self, el: ElementId) -> Option<String> {
        self.state().node(el).ok().map(|n| n.text.clone())
    }

    fn set_text_content(&self, el: ElementId, text: &str) -> Result<(), DomError> {
        let mut st = self.state();
        let children = std::mem::take(&mut st.node_mut(el)?.children);
        for child in children {
            st.node_mut(child)?.parent = None;
        }
        st.node_mut(el)?.text = text.to_string();
        Ok(())
    }

    fn create_element(&self, tag: &str) -> ElementId {
        self.state().alloc(tag)
    }

    fn prepend_child(&self, parent: ElementId, child: ElementId) -> Result<(), DomError> {
        let mut st = self.state();
        st.node(parent)?;
        st.node(child)?;
        if st.is_ancestor_or_self(child, parent) {
            return Err(DomError::Hierarchy(format!(
                "{child} cannot be inserted into its own subtree"
            )));
        }
        st.detach(child)?;
        st.node_mut(parent)?.children.insert(0, child);
        st.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn remove_element(&self, el: ElementId) -> Result<(), DomError> {
        self.state().detach(el)
    }

    fn is_connected(&self, el: ElementId) -> bool {
        self.state().is_connected(el)
    }

    fn scroll_y(&self) -> f64 {
        self.state().scroll_y
    }

    fn scroll_to(&self, options: ScrollToOptions) {
        {
            let mut st = self.state();
            st.scroll_requests.push(options);
            st.scroll_y = options.top.max(0.0);
        }
        self.dispatch(Event::new(EventKind::Scroll, EventTarget::Window));
    }

    fn add_event_listener(
        &self,
        target: EventTarget,
        kind: EventKind,
        listener: Listener,
    ) -> ListenerId {
        self.state().listeners.add(target, kind, listener)
    }

    fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.state().listeners.remove(id)
    }

    fn create_intersection_observer(&self, callback: IntersectionCallback) -> Option<ObserverId> {
        let mut st = self.state();
        if !st.intersection_supported {
            return None;
        }
        st.next_observer += 1;
        let id = ObserverId(st.next_observer);
        st.observers.insert(
            id,
            Observer {
                callback,
                targets: Vec::new(),
            },
        );
        Some(id)
    }

    fn observe(&self, observer: ObserverId, el: ElementId) -> Result<(), DomError> {
        let (callback, entry) = {
            let mut st = self.state();
            st.node(el)?;
            let is_intersecting = st.in_viewport.contains(&el);
            let obs = st
                .observers
                .get_mut(&observer)
                .ok_or(DomError::UnknownObserver(observer))?;
            if obs.targets.contains(&el) {
                return Ok(());
            }
            obs.targets.push(el);
            (
                obs.callback.clone(),
                IntersectionEntry {
                    observer,
                    target: el,
                    is_intersecting,
                },
            )
        };
        // Browsers report the initial state of every newly observed target.
        callback(&[entry]);
        Ok(())
    }

    fn unobserve(&self, observer: ObserverId, el: ElementId) {
        if let Some(obs) = self.state().observers.get_mut(&observer) {
            obs.targets.retain(|t| *t != el);
        }
    }

    fn disconnect_observer(&self, observer: ObserverId) {
        self.state().observers.remove(&observer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScrollBehavior;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn sel(s: &str) -> Selector {
        Selector::parse(s).unwrap()
    }

    #[test]
    fn query_respects_scope_and_document_order() {
        let doc = MemoryDocument::new();
        let body = doc.body();
        let form = doc.append_element(body, "form", &[]).unwrap();
        let a = doc
            .append_element(form, "input", &[("name", "a"), ("required", "")])
            .unwrap();
        let fieldset = doc.append_element(form, "fieldset", &[]).unwrap();
        let b = doc
            .append_element(fieldset, "textarea", &[("required", "")])
            .unwrap();
        let outside = doc
            .append_element(body, "input", &[("required", "")])
            .unwrap();

        assert_eq!(doc.query_selector_all(Some(form), &sel("[required]")), vec![a, b]);
        assert_eq!(
            doc.query_selector_all(None, &sel("[required]")),
            vec![a, b, outside]
        );
        assert_eq!(doc.query_selector_all(Some(form), &sel("form")), vec![]);
    }

    #[test]
    fn class_edits_are_idempotent() {
        let doc = MemoryDocument::new();
        let btn = doc
            .append_element(doc.body(), "button", &[("id", "back-to-top"), ("class", "btn")])
            .unwrap();
        doc.add_class(btn, "show").unwrap();
        doc.add_class(btn, "show").unwrap();
        assert_eq!(doc.classes(btn), vec!["btn", "show"]);
        doc.remove_class(btn, "show").unwrap();
        doc.remove_class(btn, "show").unwrap();
        assert_eq!(doc.classes(btn), vec!["btn"]);
        assert_eq!(doc.element_by_id("back-to-top"), Some(btn));
    }

    #[test]
    fn values_exist_only_on_form_controls() {
        let doc = MemoryDocument::new();
        let input = doc
            .append_element(doc.body(), "input", &[("value", "  hi ")])
            .unwrap();
        let div = doc.append_element(doc.body(), "div", &[]).unwrap();
        assert_eq!(doc.value(input).as_deref(), Some("  hi "));
        assert_eq!(doc.value(div), None);
        assert!(doc.set_value(div, "x").is_err());
    }

    #[test]
    fn prepend_and_remove_track_connection() {
        let doc = MemoryDocument::new();
        let form = doc.append_element(doc.body(), "form", &[]).unwrap();
        let first = doc.append_element(form, "input", &[]).unwrap();
        let notice = doc.create_element("div");
        assert!(!doc.is_connected(notice));

        doc.prepend_child(form, notice).unwrap();
        assert_eq!(doc.children(form), vec![notice, first]);
        assert!(doc.is_connected(notice));

        doc.remove_element(notice).unwrap();
        assert!(!doc.is_connected(notice));
        assert_eq!(doc.children(form), vec![first]);
        assert!(doc.prepend_child(first, form).is_err());
    }

    #[test]
    fn events_bubble_to_ancestors_and_window() {
        let doc = MemoryDocument::new();
        let button = doc.append_element(doc.body(), "button", &[]).unwrap();
        let icon = doc.append_element(button, "i", &[]).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        doc.add_event_listener(
            EventTarget::Element(button),
            EventKind::Click,
            Arc::new(move |ev: &mut Event| {
                assert_eq!(ev.target_element(), Some(icon));
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let h = hits.clone();
        doc.add_event_listener(
            EventTarget::Window,
            EventKind::Click,
            Arc::new(move |_: &mut Event| {
                h.fetch_add(10, Ordering::SeqCst);
            }),
        );

        doc.click(icon);
        assert_eq!(hits.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn listeners_may_reenter_the_document() {
        let doc = Arc::new(MemoryDocument::new());
        let form = doc.append_element(doc.body(), "form", &[]).unwrap();
        let d = doc.clone();
        doc.add_event_listener(
            EventTarget::Element(form),
            EventKind::Submit,
            Arc::new(move |ev: &mut Event| {
                let notice = d.create_element("div");
                d.prepend_child(form, notice).unwrap();
                ev.prevent_default();
            }),
        );

        let ev = doc.submit(form);
        assert!(ev.default_prevented());
        assert_eq!(doc.children(form).len(), 1);
        assert!(doc.submissions().is_empty());
    }

    #[test]
    fn scroll_to_records_request_and_fires_scroll() {
        let doc = MemoryDocument::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        doc.add_event_listener(
            EventTarget::Window,
            EventKind::Scroll,
            Arc::new(move |_: &mut Event| {
                f.fetch_add(1, Ordering::SeqCst);
            }),
        );
        doc.scroll_window_to(900.0);
        doc.scroll_to(ScrollToOptions {
            top: 0.0,
            behavior: ScrollBehavior::Smooth,
        });
        assert_eq!(doc.scroll_y(), 0.0);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
        assert_eq!(doc.scroll_requests().len(), 1);
    }

    #[test]
    fn observers_get_initial_and_changed_state() {
        let doc = MemoryDocument::new();
        let img = doc.append_element(doc.body(), "img", &[]).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let obs = doc
            .create_intersection_observer(Arc::new(move |entries: &[IntersectionEntry]| {
                s.lock().unwrap().extend(entries.iter().map(|e| e.is_intersecting));
            }))
            .unwrap();

        doc.observe(obs, img).unwrap();
        doc.set_in_viewport(img, true);
        doc.set_in_viewport(img, true);
        doc.unobserve(obs, img);
        doc.set_in_viewport(img, false);

        assert_eq!(*seen.lock().unwrap(), vec![false, true]);
        assert!(doc.observed_targets(obs).is_empty());
    }

    #[test]
    fn unsupported_host_has_no_observers() {
        let doc = MemoryDocument::without_intersection_observer();
        assert!(doc.create_intersection_observer(Arc::new(|_: &[IntersectionEntry]| {})).is_none());
    }
}
