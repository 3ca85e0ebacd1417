//! Loader for Gleaner configuration with YAML + environment overlays.
//!
//! Precedence, lowest to highest: built-in defaults, the YAML file (if any),
//! then `GLEANER_`-prefixed environment variables. Nested keys use `__`, so
//! `GLEANER_DELAY__MAX_SECS=2` sets `delay.max_secs`. After merging, string
//! values get `${VAR}` expansion before being deserialized.
use config::{Config, ConfigError, Environment, File};
use gleaner_common::observability::LogFormat;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "GLEANER";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GleanerConfig {
    /// Sitemap to read. May be supplied on the command line instead.
    pub sitemap_url: Option<String>,
    /// URLs containing any of these substrings are skipped.
    pub exclude: Vec<String>,
    pub output_dir: PathBuf,
    pub min_word_count: usize,
    /// Element names whose text is extracted.
    pub tags: Vec<String>,
    pub delay: DelayConfig,
    pub http: HttpConfig,
    pub log: LogSettings,
}

impl Default for GleanerConfig {
    fn default() -> Self {
        Self {
            sitemap_url: None,
            exclude: vec!["/search".to_string()],
            output_dir: PathBuf::from("data"),
            min_word_count: 10,
            tags: vec!["h1".to_string(), "p".to_string()],
            delay: DelayConfig::default(),
            http: HttpConfig::default(),
            log: LogSettings::default(),
        }
    }
}

impl GleanerConfig {
    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.delay.max_secs < self.delay.min_secs {
            return Err(format!(
                "delay.max_secs ({}) is smaller than delay.min_secs ({})",
                self.delay.max_secs, self.delay.min_secs
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err("output_dir must not be empty".to_string());
        }
        if self.http.timeout_secs == 0 {
            return Err("http.timeout_secs must be positive".to_string());
        }
        Ok(())
    }
}

/// Pause between pages, in whole seconds, drawn uniformly from `min..=max`.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DelayConfig {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            min_secs: 3,
            max_secs: 7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
    pub stderr: bool,
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::Text,
            stderr: true,
            filter: "info".to_string(),
        }
    }
}

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

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct GleanerConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env: Environment,
}

impl Default for GleanerConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl GleanerConfigLoader {
    /// Start from defaults with `GLEANER_` env overrides applied last.
    ///
    /// ```
    /// use gleaner_config::GleanerConfigLoader;
    ///
    /// let config = GleanerConfigLoader::new()
    ///     .with_yaml_str("sitemap_url: https://example.com/sitemap.xml")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.sitemap_url.as_deref(), Some("https://example.com/sitemap.xml"));
    /// assert_eq!(config.min_word_count, 10);
    /// assert_eq!(config.exclude, vec!["/search".to_string()]);
    /// ```
    pub fn new() -> Self {
        let env = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("exclude")
            .with_list_parse_key("tags");
        Self {
            builder: Config::builder(),
            env,
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is silently skipped when it does not exist.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// ```
    /// use gleaner_config::GleanerConfigLoader;
    ///
    /// let err = GleanerConfigLoader::new()
    ///     .with_yaml_str("delay: { min_secs: 5, max_secs: 1 }")
    ///     .load()
    ///     .unwrap_err();
    /// assert!(err.to_string().contains("delay.max_secs"));
    /// ```
    pub fn load(self) -> Result<GleanerConfig, ConfigError> {
        let cfg = self.builder.add_source(self.env).build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: GleanerConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;
        typed.validate().map_err(ConfigError::Message)?;

        Ok(typed)
    }
}
