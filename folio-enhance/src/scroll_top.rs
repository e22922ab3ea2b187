use std::sync::Arc;

use folio_common::ScrollTopSettings;
use folio_dom::{
    Document, ElementId, Event, EventKind, EventTarget, ListenerId, ScrollBehavior,
    ScrollToOptions,
};
use tracing::{debug, warn};

pub const SHOW_CLASS: &str = "show";

/// Back-to-top button: visible once the page is scrolled past a threshold,
/// smooth-scrolls to the top when clicked.
pub struct ScrollTopControl {
    doc: Arc<dyn Document>,
    button: ElementId,
    listeners: [ListenerId; 2],
}

impl ScrollTopControl {
    /// Wire the control to the element with the configured id. Returns `None`
    /// when the page has no such element.
    pub fn attach(doc: Arc<dyn Document>, settings: &ScrollTopSettings) -> Option<Self> {
        let Some(button) = doc.element_by_id(&settings.element_id) else {
            debug!(target: "page.scroll", id = %settings.element_id, "no back-to-top element, skipping");
            return None;
        };
        let threshold = settings.threshold_px;

        let weak = Arc::downgrade(&doc);
        let on_scroll = doc.add_event_listener(
            EventTarget::Window,
            EventKind::Scroll,
            Arc::new(move |_: &mut Event| {
                if let Some(doc) = weak.upgrade() {
                    update_visibility(doc.as_ref(), button, threshold);
                }
            }),
        );

        let weak = Arc::downgrade(&doc);
        let on_click = doc.add_event_listener(
            EventTarget::Element(button),
            EventKind::Click,
            Arc::new(move |_: &mut Event| {
                if let Some(doc) = weak.upgrade() {
                    debug!(target: "page.scroll", "scrolling to top");
                    doc.scroll_to(ScrollToOptions {
                        top: 0.0,
                        behavior: ScrollBehavior::Smooth,
                    });
                }
            }),
        );

        debug!(target: "page.scroll", %button, threshold, "back-to-top attached");
        Some(Self {
            doc,
            button,
            listeners: [on_scroll, on_click],
        })
    }

    pub fn button(&self) -> ElementId {
        self.button
    }

    pub fn dispose(self) {
        for id in self.listeners {
            self.doc.remove_event_listener(id);
        }
    }
}

/// Show `button` iff the window is scrolled strictly past `threshold`.
pub fn update_visibility(doc: &dyn Document, button: ElementId, threshold: f64) {
    let result = if doc.scroll_y() > threshold {
        doc.add_class(button, SHOW_CLASS)
    } else {
        doc.remove_class(button, SHOW_CLASS)
    };
    if let Err(err) = result {
        warn!(target: "page.scroll", %button, error = %err, "could not toggle back-to-top");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_dom::MemoryDocument;

    fn page() -> (Arc<MemoryDocument>, ElementId) {
        let doc = Arc::new(MemoryDocument::new());
        let button = doc
            .append_element(doc.body(), "button", &[("id", "back-to-top"), ("class", "btn")])
            .unwrap();
        (doc, button)
    }

    #[test]
    fn visibility_follows_threshold_strictly() {
        let (doc, button) = page();
        let _control = ScrollTopControl::attach(doc.clone(), &ScrollTopSettings::default()).unwrap();

        doc.scroll_window_to(300.0);
        assert!(!doc.has_class(button, SHOW_CLASS));
        doc.scroll_window_to(301.0);
        assert!(doc.has_class(button, SHOW_CLASS));
        doc.scroll_window_to(1200.0);
        assert!(doc.has_class(button, SHOW_CLASS));
        doc.scroll_window_to(0.0);
        assert!(!doc.has_class(button, SHOW_CLASS));
        assert!(doc.has_class(button, "btn"));
    }

    #[test]
    fn click_scrolls_smoothly_to_top_and_hides() {
        let (doc, button) = page();
        let _control = ScrollTopControl::attach(doc.clone(), &ScrollTopSettings::default()).unwrap();

        doc.scroll_window_to(800.0);
        doc.click(button);

        assert_eq!(
            doc.scroll_requests(),
            vec![ScrollToOptions {
                top: 0.0,
                behavior: ScrollBehavior::Smooth
            }]
        );
        assert_eq!(doc.scroll_y(), 0.0);
        assert!(!doc.has_class(button, SHOW_CLASS));
    }

    #[test]
    fn missing_button_skips_the_feature() {
        let doc = Arc::new(MemoryDocument::new());
        assert!(ScrollTopControl::attach(doc.clone(), &ScrollTopSettings::default()).is_none());
        assert_eq!(doc.listener_count(), 0);
    }

    #[test]
    fn dispose_detaches_listeners() {
        let (doc, button) = page();
        let control = ScrollTopControl::attach(doc.clone(), &ScrollTopSettings::default()).unwrap();
        assert_eq!(doc.listener_count(), 2);
        control.dispose();
        assert_eq!(doc.listener_count(), 0);

        doc.scroll_window_to(900.0);
        assert!(!doc.has_class(button, SHOW_CLASS));
    }

    #[test]
    fn custom_threshold_is_honoured() {
        let (doc, button) = page();
        let settings = ScrollTopSettings {
            threshold_px: 50.0,
            ..ScrollTopSettings::default()
        };
        let _control = ScrollTopControl::attach(doc.clone(), &settings).unwrap();
        doc.scroll_window_to(51.0);
        assert!(doc.has_class(button, SHOW_CLASS));
    }
}
