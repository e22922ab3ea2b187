//! Host-side composition root: settings, logging, the page runtime and the
//! enhancements, wired in that order.
//!
//! ```no_run
//! use folio_dom::MemoryDocument;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let doc = Arc::new(MemoryDocument::new());
//! let page = folio_app::boot(doc).expect("page boots");
//! page.run_for(Duration::from_secs(6));
//! page.shutdown();
//! ```
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use folio_common::observability::{init_logging, LogConfig};
use folio_common::{FolioError, PageSettings, Result};
use folio_config::FolioConfigLoader;
use folio_dom::Document;
use folio_enhance::Enhancements;
use folio_runtime::PageRuntime;
use tracing::info;

pub const APP_NAME: &str = "folio";
/// Looked up in the working directory; a missing file means defaults.
pub const CONFIG_FILE: &str = "folio.yaml";

const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// A page with its behaviors attached and the runtime driving their timers.
pub struct BootedPage {
    runtime: PageRuntime,
    enhancements: Enhancements,
    settings: PageSettings,
    log_path: PathBuf,
}

/// Boot `doc` with `folio.yaml` (if present) and `FOLIO__` overrides.
pub fn boot(doc: Arc<dyn Document>) -> Result<BootedPage> {
    boot_with(doc, FolioConfigLoader::new().with_optional_file(CONFIG_FILE))
}

/// Boot `doc` with settings from a caller-built loader.
pub fn boot_with(doc: Arc<dyn Document>, loader: FolioConfigLoader) -> Result<BootedPage> {
    // 1) Settings (env wins over the file)
    let settings = loader
        .load()
        .map_err(|e| FolioError::Config(e.to_string()))?;

    // 2) Logging from the `logging` section
    let log_path = init_logging(LogConfig::from_settings(APP_NAME, &settings.logging))?;

    // 3) Event loop, then the behaviors on top of it
    let runtime = PageRuntime::build("folio-page")?;
    let enhancements = folio_enhance::initialize(doc, runtime.handle(), &settings)?;
    info!(log_path = %log_path.display(), "page booted");

    Ok(BootedPage {
        runtime,
        enhancements,
        settings,
        log_path,
    })
}

impl BootedPage {
    pub fn settings(&self) -> &PageSettings {
        &self.settings
    }

    pub fn enhancements(&self) -> &Enhancements {
        &self.enhancements
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Drive the page's event loop until `fut` completes.
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Let timers and fetches run for `period`.
    pub fn run_for(&self, period: Duration) {
        self.runtime.block_on(tokio::time::sleep(period));
    }

    /// Detach every behavior and stop the runtime.
    pub fn shutdown(self) {
        self.enhancements.dispose();
        self.runtime.shutdown(SHUTDOWN_GRACE);
        info!("page shut down");
    }
}
