use folio_common::{LogFormat, NoticePolicy};
use folio_config::FolioConfigLoader;
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn test_config_load() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
scroll_top:
  threshold_px: 450
alerts:
  dismiss_after_ms: 8000
forms:
  notice_policy: replace
search:
  base_url: "${FOLIO_IT_SUGGEST_HOST}"
  retries: 1
logging:
  format: json
  filter: "debug"
  "#;
    let p = write_yaml(&tmp, "folio.yaml", file_yaml);

    temp_env::with_var("FOLIO_IT_SUGGEST_HOST", Some("http://127.0.0.1:9000"), || {
        let settings = FolioConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load page settings");

        assert_eq!(settings.scroll_top.threshold_px, 450.0);
        assert_eq!(settings.alerts.dismiss_after_ms, 8000);
        assert_eq!(settings.forms.notice_policy, NoticePolicy::Replace);
        assert_eq!(settings.search.base_url, "http://127.0.0.1:9000");
        assert_eq!(settings.search.retries, 1);
        assert_eq!(settings.search.endpoint, "/api/search/suggest");
        assert_eq!(settings.logging.format, LogFormat::Json);
    });
}

#[test]
#[serial]
fn env_overrides_win_over_file() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(&tmp, "folio.yaml", "search:\n  debounce_ms: 500\n");

    temp_env::with_var("FOLIO__SEARCH__DEBOUNCE_MS", Some("150"), || {
        let settings = FolioConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load page settings");
        assert_eq!(settings.search.debounce_ms, 150);
    });
}

#[test]
#[serial]
fn missing_optional_file_falls_back_to_defaults() {
    let tmp = TempDir::new().unwrap();
    let settings = FolioConfigLoader::new()
        .with_optional_file(tmp.path().join("absent.yaml"))
        .load()
        .expect("optional file may be absent");
    assert_eq!(settings.alerts.dismiss_after_ms, 5000);
}

#[test]
#[serial]
fn missing_required_file_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let err = FolioConfigLoader::new()
        .with_file(tmp.path().join("absent.yaml"))
        .load();
    assert!(err.is_err());
}
