use std::sync::Arc;

use folio_common::AlertSettings;
use folio_dom::{Document, DomError, ElementId, Selector};
use folio_runtime::PageHandle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Closes an alert widget.
pub trait AlertCloser: Send + Sync {
    fn close(&self, doc: &dyn Document, alert: ElementId);
}

/// Mirrors Bootstrap's `Alert.close`: drop the `show` class, then take the
/// element out of the document.
#[derive(Debug, Default, Clone, Copy)]
pub struct BootstrapAlertCloser;

impl AlertCloser for BootstrapAlertCloser {
    fn close(&self, doc: &dyn Document, alert: ElementId) {
        if !doc.is_connected(alert) {
            debug!(target: "page.alerts", %alert, "alert already gone");
            return;
        }
        let closed = doc
            .remove_class(alert, "show")
            .and_then(|_| doc.remove_element(alert));
        match closed {
            Ok(()) => info!(target: "page.alerts", %alert, "alert dismissed"),
            Err(err) => warn!(target: "page.alerts", %alert, error = %err, "alert close failed"),
        }
    }
}

/// One-shot dismissal timers for the alerts present when the page loaded.
///
/// Alerts inserted later are not picked up.
pub struct AlertAutoDismiss {
    timers: Vec<JoinHandle<Option<()>>>,
}

impl AlertAutoDismiss {
    pub fn schedule(
        doc: Arc<dyn Document>,
        handle: &PageHandle,
        settings: &AlertSettings,
        closer: Arc<dyn AlertCloser>,
    ) -> Result<Self, DomError> {
        let selector = Selector::parse(&settings.selector)?;
        let delay = settings.dismiss_after();
        let timers: Vec<_> = doc
            .query_selector_all(None, &selector)
            .into_iter()
            .map(|alert| {
                let weak = Arc::downgrade(&doc);
                let closer = closer.clone();
                handle.spawn_after(delay, move || {
                    if let Some(doc) = weak.upgrade() {
                        closer.close(doc.as_ref(), alert);
                    }
                })
            })
            .collect();
        debug!(target: "page.alerts", count = timers.len(), after_ms = settings.dismiss_after_ms, "alert dismissal scheduled");
        Ok(Self { timers })
    }

    /// Number of timers that have not fired yet.
    pub fn pending(&self) -> usize {
        self.timers.iter().filter(|t| !t.is_finished()).count()
    }

    /// Abort timers that have not fired yet.
    pub fn dispose(self) {
        for timer in self.timers {
            timer.abort();
        }
    }
}
