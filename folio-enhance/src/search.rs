//! Search-box suggestions: debounced input, a suggestion source behind a
//! trait, and a sink that displays what came back.

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use folio_common::SearchSettings;
use folio_dom::{Document, DomError, ElementId, Event, EventKind, EventTarget, ListenerId, Selector};
use folio_http::{HttpClient, HttpError, RequestOpts};
use folio_runtime::PageHandle;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::Debouncer;

/// Body of the suggestion endpoint. A missing field reads as no suggestions.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SuggestResponse {
    #[serde(default)]
    pub suggestions: Vec<Value>,
}

#[async_trait]
pub trait SuggestionSource: Send + Sync {
    async fn suggest(&self, query: &str) -> Result<Vec<Value>, HttpError>;
}

/// Fetches `GET <endpoint>?q=<query>` through [`HttpClient`].
///
/// The query is form-encoded, so a space goes out as `+` where a browser's
/// `encodeURIComponent` would send `%20`. Form decoders read both as a space.
pub struct HttpSuggestionSource {
    client: HttpClient,
    endpoint: String,
}

impl HttpSuggestionSource {
    pub fn new(client: HttpClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Build the client from the `search` section.
    ///
    /// ```
    /// use folio_common::SearchSettings;
    /// use folio_enhance::search::HttpSuggestionSource;
    ///
    /// let source = HttpSuggestionSource::from_settings(&SearchSettings::default()).unwrap();
    /// assert_eq!(source.endpoint(), "/api/search/suggest");
    /// ```
    pub fn from_settings(settings: &SearchSettings) -> Result<Self, HttpError> {
        let client = HttpClient::new(&settings.base_url)?
            .with_timeout(settings.timeout())
            .with_retries(settings.retries);
        Ok(Self::new(client, settings.endpoint.clone()))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SuggestionSource for HttpSuggestionSource {
    async fn suggest(&self, query: &str) -> Result<Vec<Value>, HttpError> {
        let opts = RequestOpts {
            query: Some(vec![("q", Cow::Borrowed(query))]),
            ..RequestOpts::default()
        };
        let body: SuggestResponse = self.client.get_json(&self.endpoint, opts).await?;
        Ok(body.suggestions)
    }
}

/// Where suggestions end up once fetched.
pub trait SuggestionSink: Send + Sync {
    fn show(&self, query: &str, suggestions: &[Value]);
}

/// Writes suggestions to the log; the page has no suggestion widget yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl SuggestionSink for LogSink {
    fn show(&self, query: &str, suggestions: &[Value]) {
        let rendered = Value::Array(suggestions.to_vec());
        info!(
            target: "page.search",
            query,
            count = suggestions.len(),
            suggestions = %rendered,
            "search suggestions"
        );
    }
}

/// Debounced suggestion lookups for the search box.
pub struct SearchSuggester {
    doc: Arc<dyn Document>,
    input: ElementId,
    listener: ListenerId,
    debouncer: Arc<Debouncer<()>>,
    generation: Arc<AtomicU64>,
}

impl SearchSuggester {
    /// Wire the input matching the configured selector. `Ok(None)` when the
    /// page has no search box.
    pub fn attach(
        doc: Arc<dyn Document>,
        handle: PageHandle,
        settings: &SearchSettings,
        source: Arc<dyn SuggestionSource>,
        sink: Arc<dyn SuggestionSink>,
    ) -> Result<Option<Self>, DomError> {
        let selector = Selector::parse(&settings.input_selector)?;
        let Some(input) = doc.query_selector(None, &selector) else {
            debug!(target: "page.search", selector = %selector, "no search input, skipping");
            return Ok(None);
        };

        let generation = Arc::new(AtomicU64::new(0));
        let lookup = Lookup {
            doc: Arc::downgrade(&doc),
            input,
            min_chars: settings.min_query_chars,
            handle: handle.clone(),
            source,
            sink,
            generation: generation.clone(),
        };
        let debouncer = Arc::new(Debouncer::new(handle, settings.debounce(), move |()| {
            lookup.run()
        }));

        let on_input = debouncer.clone();
        let listener = doc.add_event_listener(
            EventTarget::Element(input),
            EventKind::Input,
            Arc::new(move |_: &mut Event| on_input.call(())),
        );
        debug!(target: "page.search", %input, debounce_ms = settings.debounce_ms, "search suggestions attached");

        Ok(Some(Self {
            doc,
            input,
            listener,
            debouncer,
            generation,
        }))
    }

    pub fn input(&self) -> ElementId {
        self.input
    }

    /// Whether a lookup is waiting out the debounce window.
    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Stop listening, drop the pending lookup and ignore in-flight responses.
    pub fn dispose(self) {
        self.doc.remove_event_listener(self.listener);
        self.debouncer.cancel();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// State the debounced handler needs once the quiet period elapses.
struct Lookup {
    doc: std::sync::Weak<dyn Document>,
    input: ElementId,
    min_chars: usize,
    handle: PageHandle,
    source: Arc<dyn SuggestionSource>,
    sink: Arc<dyn SuggestionSink>,
    generation: Arc<AtomicU64>,
}

impl Lookup {
    fn run(&self) {
        let Some(doc) = self.doc.upgrade() else {
            return;
        };
        // Every settled query supersedes responses still in flight, even one
        // too short to be sent.
        let issued = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let query = doc.value(self.input).unwrap_or_default().trim().to_string();
        if query.chars().count() < self.min_chars {
            debug!(target: "page.search", chars = query.chars().count(), "query too short");
            return;
        }

        let source = self.source.clone();
        let sink = self.sink.clone();
        let generation = self.generation.clone();
        debug!(target: "page.search", %query, issued, "requesting suggestions");
        self.handle.spawn(async move {
            match source.suggest(&query).await {
                Ok(suggestions) if generation.load(Ordering::SeqCst) == issued => {
                    sink.show(&query, &suggestions);
                }
                Ok(_) => debug!(target: "page.search", %query, issued, "stale suggestions dropped"),
                Err(err) => warn!(target: "page.search", %query, error = %err, "suggestion request failed"),
            }
        });
    }
}
