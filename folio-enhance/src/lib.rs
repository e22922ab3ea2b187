//! Progressive enhancements for the blog's server-rendered pages.
//!
//! [`initialize`] wires every behavior against a [`Document`] once the page
//! has loaded and hands back an [`Enhancements`] value that owns their
//! listeners, observers and timers:
//!
//! - [`scroll_top`]: back-to-top button
//! - [`alerts`]: auto-dismissal of flash messages
//! - [`forms`]: required-field guard on submit
//! - [`lazy_images`]: deferred image loading
//! - [`search`]: debounced search suggestions
//!
//! ```
//! use folio_common::PageSettings;
//! use folio_dom::MemoryDocument;
//! use folio_runtime::PageRuntime;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let runtime = PageRuntime::build("page").unwrap();
//! let doc = Arc::new(MemoryDocument::new());
//! doc.append_element(doc.body(), "button", &[("id", "back-to-top")]).unwrap();
//!
//! let page = folio_enhance::initialize(doc.clone(), runtime.handle(), &PageSettings::default()).unwrap();
//! assert!(page.scroll_top.is_some());
//! assert!(page.search.is_none());
//! page.dispose();
//! runtime.shutdown(Duration::from_millis(10));
//! ```
pub mod alerts;
pub mod debounce;
pub mod forms;
pub mod lazy_images;
pub mod scroll_top;
pub mod search;

use std::sync::Arc;

use folio_common::{FolioError, PageSettings, Result};
use folio_dom::{Document, DomError, Selector};
use folio_runtime::PageHandle;
use tracing::info;

pub use alerts::{AlertAutoDismiss, AlertCloser, BootstrapAlertCloser};
pub use debounce::Debouncer;
pub use forms::{FormGuard, ValidationReport};
pub use lazy_images::LazyImageLoader;
pub use scroll_top::ScrollTopControl;
pub use search::{HttpSuggestionSource, LogSink, SearchSuggester, SuggestionSink, SuggestionSource};

/// Replaceable collaborators of the behaviors.
#[derive(Clone)]
pub struct Collaborators {
    pub alert_closer: Arc<dyn AlertCloser>,
    pub suggestion_source: Arc<dyn SuggestionSource>,
    pub suggestion_sink: Arc<dyn SuggestionSink>,
}

impl Collaborators {
    /// Bootstrap alerts, HTTP suggestions and a logging sink.
    pub fn from_settings(settings: &PageSettings) -> Result<Self> {
        let source = HttpSuggestionSource::from_settings(&settings.search)
            .map_err(|e| FolioError::Http(e.to_string()))?;
        Ok(Self {
            alert_closer: Arc::new(BootstrapAlertCloser),
            suggestion_source: Arc::new(source),
            suggestion_sink: Arc::new(LogSink),
        })
    }
}

/// Live behaviors of one page. Features whose markup is absent are `None`.
pub struct Enhancements {
    pub scroll_top: Option<ScrollTopControl>,
    pub alerts: AlertAutoDismiss,
    pub forms: FormGuard,
    pub lazy_images: Option<LazyImageLoader>,
    pub search: Option<SearchSuggester>,
}

impl Enhancements {
    /// Detach every listener, observer and pending timer.
    pub fn dispose(self) {
        if let Some(control) = self.scroll_top {
            control.dispose();
        }
        self.alerts.dispose();
        self.forms.dispose();
        if let Some(loader) = self.lazy_images {
            loader.dispose();
        }
        if let Some(search) = self.search {
            search.dispose();
        }
    }
}

/// Attach all behaviors with the default collaborators.
pub fn initialize(
    doc: Arc<dyn Document>,
    handle: PageHandle,
    settings: &PageSettings,
) -> Result<Enhancements> {
    let collaborators = Collaborators::from_settings(settings)?;
    initialize_with(doc, handle, settings, collaborators)
}

/// Attach all behaviors with caller-supplied collaborators.
///
/// Configured selectors are checked before anything is attached, so a bad
/// selector leaves the page untouched.
pub fn initialize_with(
    doc: Arc<dyn Document>,
    handle: PageHandle,
    settings: &PageSettings,
    collaborators: Collaborators,
) -> Result<Enhancements> {
    for selector in [
        &settings.alerts.selector,
        &settings.lazy_images.selector,
        &settings.search.input_selector,
    ] {
        Selector::parse(selector).map_err(dom_error)?;
    }

    let scroll_top = ScrollTopControl::attach(doc.clone(), &settings.scroll_top);
    let alerts = AlertAutoDismiss::schedule(
        doc.clone(),
        &handle,
        &settings.alerts,
        collaborators.alert_closer,
    )
    .map_err(dom_error)?;
    let forms = FormGuard::attach(doc.clone(), &settings.forms).map_err(dom_error)?;
    let lazy_images = LazyImageLoader::attach(doc.clone(), &settings.lazy_images).map_err(dom_error)?;
    let search = SearchSuggester::attach(
        doc,
        handle,
        &settings.search,
        collaborators.suggestion_source,
        collaborators.suggestion_sink,
    )
    .map_err(dom_error)?;

    info!(
        scroll_top = scroll_top.is_some(),
        alerts = alerts.pending(),
        forms = forms.guarded_forms(),
        lazy_images = lazy_images.as_ref().map_or(0, LazyImageLoader::observed),
        search = search.is_some(),
        "page enhancements initialized"
    );
    Ok(Enhancements {
        scroll_top,
        alerts,
        forms,
        lazy_images,
        search,
    })
}

fn dom_error(err: DomError) -> FolioError {
    FolioError::Dom(err.to_string())
}
