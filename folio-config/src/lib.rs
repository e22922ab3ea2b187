//! Loader for page-enhancement settings with YAML + environment overlays.
//!
//! Sources are merged in the order they are added. `FOLIO__<SECTION>__<FIELD>`
//! environment variables are applied last and win, e.g.
//! `FOLIO__SEARCH__DEBOUNCE_MS=150`. String values may reference `${VAR}`.
use config::{Config, ConfigError, Environment, File};
use folio_common::PageSettings;
use serde_json::Value;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring.
pub struct FolioConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env_prefix: &'static str,
}

impl Default for FolioConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl FolioConfigLoader {
    /// Start with no file sources; `FOLIO__` env overrides are applied on load.
    ///
    /// ```
    /// use folio_config::FolioConfigLoader;
    ///
    /// let settings = FolioConfigLoader::new()
    ///     .with_yaml_str("scroll_top:\n  threshold_px: 120")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(settings.scroll_top.threshold_px, 120.0);
    /// assert_eq!(settings.scroll_top.element_id, "back-to-top");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            env_prefix: "FOLIO",
        }
    }

    /// Use a different env prefix (mostly for tests running in parallel).
    pub fn with_env_prefix(mut self, prefix: &'static str) -> Self {
        self.env_prefix = prefix;
        self
    }

    /// Attach a YAML/TOML/JSON file; the format is inferred from the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent, so hosts can run on env vars alone.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use folio_common::NoticePolicy;
    /// use folio_config::FolioConfigLoader;
    ///
    /// let settings = FolioConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// forms:
    ///   notice_policy: replace
    ///   message: "Please fill in all required fields"
    /// search:
    ///   debounce_ms: 250
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(settings.forms.notice_policy, NoticePolicy::Replace);
    /// assert_eq!(settings.search.debounce_ms, 250);
    /// assert_eq!(settings.search.min_query_chars, 3);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge all sources, expand `${VAR}` placeholders, and deserialize.
    ///
    /// ```
    /// use folio_config::FolioConfigLoader;
    ///
    /// unsafe { std::env::set_var("SUGGEST_HOST", "https://blog.example.com"); }
    ///
    /// let settings = FolioConfigLoader::new()
    ///     .with_yaml_str("search:\n  base_url: \"${SUGGEST_HOST}\"")
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(settings.search.base_url, "https://blog.example.com");
    ///
    /// unsafe { std::env::remove_var("SUGGEST_HOST"); }
    /// ```
    pub fn load(self) -> Result<PageSettings, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(self.env_prefix)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        // An empty source set deserializes to `null` rather than `{}`.
        if v.is_null() {
            v = Value::Object(Default::default());
        }

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
