//! Common types shared across the Folio page-enhancement crates.
//!
//! This crate holds the settings model every behavior reads, the shared error
//! type, and the observability helpers. It stays dependency-light so that the
//! DOM, HTTP, and behavior crates can all depend on it.
//!
//! # Overview
//!
//! - [`PageSettings`]: tunables for every page behavior
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`FolioError`] and [`Result`]: shared error handling
//! - [`NoticePolicy`] and [`LogFormat`]: enums describing behavior
//!
//! # Examples
//!
//! ```rust
//! use folio_common::{NoticePolicy, PageSettings};
//!
//! let settings = PageSettings::default();
//! assert_eq!(settings.scroll_top.threshold_px, 300.0);
//! assert_eq!(settings.forms.notice_policy, NoticePolicy::Accumulate);
//! ```
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod observability;

pub use observability::LogFormat;

/// Tunables for all page behaviors.
///
/// Every section has defaults matching the markup rendered by the blog
/// templates, so an empty configuration file yields a working page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PageSettings {
    pub scroll_top: ScrollTopSettings,
    pub alerts: AlertSettings,
    pub forms: FormSettings,
    pub lazy_images: LazyImageSettings,
    pub search: SearchSettings,
    pub logging: LogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScrollTopSettings {
    /// Id of the back-to-top control.
    pub element_id: String,
    /// Offset the page must scroll *past* before the control is shown.
    pub threshold_px: f64,
}

impl Default for ScrollTopSettings {
    fn default() -> Self {
        Self {
            element_id: "back-to-top".into(),
            threshold_px: 300.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertSettings {
    pub selector: String,
    pub dismiss_after_ms: u64,
}

impl AlertSettings {
    pub fn dismiss_after(&self) -> Duration {
        Duration::from_millis(self.dismiss_after_ms)
    }
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            selector: ".alert".into(),
            dismiss_after_ms: 5000,
        }
    }
}

/// What to do with notices left over from earlier failed submissions.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticePolicy {
    /// Prepend a fresh notice on every failed attempt.
    #[default]
    Accumulate,
    /// Remove notices injected by earlier attempts before prepending.
    Replace,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FormSettings {
    pub message: String,
    pub notice_policy: NoticePolicy,
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            message: "请填写所有必填字段".into(),
            notice_policy: NoticePolicy::Accumulate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LazyImageSettings {
    pub selector: String,
}

impl Default for LazyImageSettings {
    fn default() -> Self {
        Self {
            selector: "img.lazy".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    pub input_selector: String,
    pub debounce_ms: u64,
    /// Shortest trimmed query (in characters) that reaches the network.
    pub min_query_chars: usize,
    pub base_url: String,
    pub endpoint: String,
    pub timeout_ms: u64,
    pub retries: usize,
}

impl SearchSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            input_selector: r#"input[name="q"]"#.into(),
            debounce_ms: 300,
            min_query_chars: 3,
            base_url: "http://localhost:8000".into(),
            endpoint: "/api/search/suggest".into(),
            timeout_ms: 5000,
            retries: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogSettings {
    pub format: LogFormat,
    /// Filter applied when `RUST_LOG` is unset.
    pub filter: String,
    pub emit_stderr: bool,
    pub log_dir: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            filter: "info".into(),
            emit_stderr: false,
            log_dir: None,
        }
    }
}

/// Error types used across the Folio crates.
#[derive(thiserror::Error, Debug)]
pub enum FolioError {
    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A DOM capability rejected an operation.
    #[error("DOM error: {0}")]
    Dom(String),

    /// The suggestion service could not be reached or decoded.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Runtime or logging setup failed.
    #[error("Setup error: {0}")]
    Setup(#[from] anyhow::Error),
}

/// Convenient alias for results that use [`FolioError`].
pub type Result<T> = std::result::Result<T, FolioError>;
