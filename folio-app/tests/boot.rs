use std::fs;
use std::sync::Arc;
use std::time::Duration;

use folio_app::boot_with;
use folio_config::FolioConfigLoader;
use folio_dom::{Document, MemoryDocument};

#[test]
fn config_file_drives_logging_and_behaviors() {
    let dir = tempfile::tempdir().unwrap();
    let log_dir = dir.path().join("logs");
    let config = dir.path().join("folio.yaml");
    fs::write(
        &config,
        format!(
            "alerts:\n  dismiss_after_ms: 50\nlogging:\n  filter: debug\n  log_dir: \"{}\"\n",
            log_dir.display()
        ),
    )
    .unwrap();

    let doc = Arc::new(MemoryDocument::new());
    let alert = doc
        .append_element(doc.body(), "div", &[("class", "alert alert-info fade show")])
        .unwrap();
    doc.append_element(doc.body(), "button", &[("id", "back-to-top")])
        .unwrap();

    let page = boot_with(
        doc.clone(),
        FolioConfigLoader::new()
            .with_env_prefix("FOLIO_BOOT_TEST")
            .with_file(&config),
    )
    .expect("page boots");

    assert_eq!(page.settings().alerts.dismiss_after_ms, 50);
    assert_eq!(page.settings().logging.filter, "debug");
    assert!(page.log_path().starts_with(&log_dir), "{}", page.log_path().display());
    assert!(log_dir.is_dir());
    assert!(page.enhancements().scroll_top.is_some());

    assert!(doc.is_connected(alert));
    page.run_for(Duration::from_millis(200));
    assert!(!doc.is_connected(alert));

    page.shutdown();
    assert_eq!(doc.listener_count(), 0);
    assert_eq!(doc.observer_count(), 0);
}
