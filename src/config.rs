//! Agent configuration
//!
//! Defaults, then an optional YAML file, then environment variables. The
//! result is validated once at startup and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable names read at startup
pub const ENV_BASE_URL: &str = "BASE_URL";
pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_LOG_FORMAT: &str = "LOG_FORMAT";
pub const ENV_LOG_FILE: &str = "LOG_FILE";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_MAX_CONSECUTIVE_CONTINUES: &str = "MAX_CONSECUTIVE_CONTINUES";
pub const ENV_POLL_INTERVAL_SECS: &str = "POLL_INTERVAL_SECS";
pub const ENV_TEMPLATES_DIR: &str = "TEMPLATES_DIR";

/// Errors raised while assembling configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    MissingSetting(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    /// Request timeout; `None` leaves the transport default in place
    pub timeout_secs: Option<u64>,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// `json` (any case) selects JSON; everything else is pretty
    pub fn from_setting(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Empty means stdout
    pub file: String,
    pub level: String,
    /// Roll the log file over once it passes this size; 0 never rolls
    pub max_file_bytes: u64,
    /// Rolled files kept as `<file>.1` .. `<file>.N`
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            file: String::new(),
            level: "debug".to_string(),
            max_file_bytes: 100 * 1024 * 1024,
            max_files: 7,
        }
    }
}

impl LoggingConfig {
    pub fn file_path(&self) -> Option<PathBuf> {
        let trimmed = self.file.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub poll_interval_secs: u64,
    pub max_consecutive_continues: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            max_consecutive_continues: 5,
        }
    }
}

impl AgentConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub templates_dir: PathBuf,
    pub ready_template: String,
    pub input_template: String,
    pub settle_ms: u64,
    pub keystroke_interval_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("images"),
            ready_template: "start_again.png".to_string(),
            input_template: "type_your.png".to_string(),
            settle_ms: 1000,
            keystroke_interval_ms: 100,
        }
    }
}

impl UiConfig {
    pub fn ready_template_path(&self) -> PathBuf {
        self.templates_dir.join(&self.ready_template)
    }

    pub fn input_template_path(&self) -> PathBuf {
        self.templates_dir.join(&self.input_template)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn keystroke_interval(&self) -> Duration {
        Duration::from_millis(self.keystroke_interval_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub logging: LoggingConfig,
    pub agent: AgentConfig,
    pub ui: UiConfig,
}

impl Config {
    /// Load configuration with fallback chain, overlay the process
    /// environment and validate.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::load_file_layer(config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// File layer only: explicit path, then the user config dir, then the
    /// working directory, then defaults.
    pub fn load_file_layer(config_path: Option<&PathBuf>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let project_name = env!("CARGO_PKG_NAME");

        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => log::warn!("Skipping {}: {}", primary_config.display(), e),
                }
            }
        }

        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => log::warn!("Skipping {}: {}", fallback_config.display(), e),
            }
        }

        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay environment variables. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BASE_URL) {
            self.api.base_url = url;
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api.api_key = key;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.logging.format = LogFormat::from_setting(&format);
        }
        if let Some(file) = lookup(ENV_LOG_FILE) {
            self.logging.file = file;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|l| !l.trim().is_empty()) {
            self.logging.level = level;
        }
        if let Some(raw) = lookup(ENV_MAX_CONSECUTIVE_CONTINUES) {
            self.agent.max_consecutive_continues = parse_number(ENV_MAX_CONSECUTIVE_CONTINUES, &raw)?;
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_SECS) {
            self.agent.poll_interval_secs = parse_number(ENV_POLL_INTERVAL_SECS, &raw)?;
        }
        if let Some(dir) = lookup(ENV_TEMPLATES_DIR).filter(|d| !d.trim().is_empty()) {
            self.ui.templates_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Base URL and API key are required
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::MissingSetting(ENV_BASE_URL));
        }
        if self.api.api_key.trim().is_empty() {
            return Err(ConfigError::MissingSetting(ENV_API_KEY));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}
