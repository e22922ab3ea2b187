use std::sync::{Arc, Weak};

use folio_common::LazyImageSettings;
use folio_dom::{Document, DomError, IntersectionEntry, ObserverId, Selector};
use tracing::{debug, warn};

pub const LAZY_CLASS: &str = "lazy";

/// Swaps `data-src` into `src` the first time a tagged image intersects the
/// viewport.
pub struct LazyImageLoader {
    doc: Arc<dyn Document>,
    observer: ObserverId,
    observed: usize,
}

impl LazyImageLoader {
    /// Observe every image matching the configured selector. Returns `None`
    /// when the host cannot observe intersections.
    pub fn attach(
        doc: Arc<dyn Document>,
        settings: &LazyImageSettings,
    ) -> Result<Option<Self>, DomError> {
        let selector = Selector::parse(&settings.selector)?;
        let weak = Arc::downgrade(&doc);
        let Some(observer) = doc.create_intersection_observer(Arc::new(
            move |entries: &[IntersectionEntry]| on_intersection(&weak, entries),
        )) else {
            debug!(target: "page.lazy", "intersection observation unsupported, lazy loading disabled");
            return Ok(None);
        };

        let images = doc.query_selector_all(None, &selector);
        for &img in &images {
            if let Err(err) = doc.observe(observer, img) {
                doc.disconnect_observer(observer);
                return Err(err);
            }
        }
        debug!(target: "page.lazy", images = images.len(), "lazy images observed");
        Ok(Some(Self {
            doc,
            observer,
            observed: images.len(),
        }))
    }

    /// Images handed to the observer at attach time.
    pub fn observed(&self) -> usize {
        self.observed
    }

    pub fn dispose(self) {
        self.doc.disconnect_observer(self.observer);
    }
}

fn on_intersection(doc: &Weak<dyn Document>, entries: &[IntersectionEntry]) {
    let Some(doc) = doc.upgrade() else {
        return;
    };
    for entry in entries.iter().filter(|e| e.is_intersecting) {
        let img = entry.target;
        let loaded = match doc.attribute(img, "data-src") {
            Some(src) => doc.set_attribute(img, "src", &src).map(|_| Some(src)),
            None => Ok(None),
        };
        match loaded {
            Ok(Some(src)) => debug!(target: "page.lazy", %img, %src, "image loaded"),
            Ok(None) => warn!(target: "page.lazy", %img, "lazy image has no data-src"),
            Err(err) => warn!(target: "page.lazy", %img, error = %err, "could not set src"),
        }
        if let Err(err) = doc.remove_class(img, LAZY_CLASS) {
            warn!(target: "page.lazy", %img, error = %err, "could not untag image");
        }
        doc.unobserve(entry.observer, img);
    }
}
