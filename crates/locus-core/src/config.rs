//! Runtime configuration
//!
//! Loaded from a TOML file with every section optional. Values not present
//! in the file fall back to the defaults below, and `LOCUS_*` environment
//! variables can override individual keys.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Failed to parse config: {message}")]
    Parse { message: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocusConfig {
    pub provisioning: ProvisioningSettings,
    pub worker: WorkerSettings,
    pub storage: StorageSettings,
}

/// Stack deployment and polling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningSettings {
    pub poll_interval_ms: u64,
    pub poll_timeout_ms: u64,
    pub stack_name_prefix: String,
    pub bucket_prefix: String,
    pub default_region: String,
}

impl Default for ProvisioningSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            poll_timeout_ms: 600_000,
            stack_name_prefix: "locus-user-".to_string(),
            bucket_prefix: "locus-".to_string(),
            default_region: crate::credentials::DEFAULT_BOOTSTRAP_REGION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Attempts before a retryable failure becomes terminal
    pub max_attempts: u32,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Directory for encrypted records; the platform data dir when unset
    pub data_dir: Option<PathBuf>,
    /// Stack template override; the bundled template when unset
    pub template_path: Option<PathBuf>,
}

impl LocusConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, returning defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file absent, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Apply `LOCUS_*` overrides from the given variables.
    ///
    /// Recognised keys: `LOCUS_POLL_INTERVAL_MS`, `LOCUS_POLL_TIMEOUT_MS`,
    /// `LOCUS_DEFAULT_REGION`, `LOCUS_MAX_ATTEMPTS`, `LOCUS_DATA_DIR`,
    /// `LOCUS_TEMPLATE_PATH`. Others are ignored.
    pub fn merge_with_env<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                "LOCUS_POLL_INTERVAL_MS" => {
                    self.provisioning.poll_interval_ms = parse_number(&key, &value)?;
                }
                "LOCUS_POLL_TIMEOUT_MS" => {
                    self.provisioning.poll_timeout_ms = parse_number(&key, &value)?;
                }
                "LOCUS_DEFAULT_REGION" => self.provisioning.default_region = value,
                "LOCUS_MAX_ATTEMPTS" => self.worker.max_attempts = parse_number(&key, &value)?,
                "LOCUS_DATA_DIR" => self.storage.data_dir = Some(PathBuf::from(value)),
                "LOCUS_TEMPLATE_PATH" => self.storage.template_path = Some(PathBuf::from(value)),
                _ => {}
            }
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.provisioning;
        if p.poll_interval_ms == 0 {
            return Err(ConfigError::invalid("poll_interval_ms must be greater than zero"));
        }
        if p.poll_timeout_ms < p.poll_interval_ms {
            return Err(ConfigError::invalid(
                "poll_timeout_ms must not be shorter than poll_interval_ms",
            ));
        }
        if p.stack_name_prefix.trim().is_empty() || p.bucket_prefix.trim().is_empty() {
            return Err(ConfigError::invalid("stack and bucket prefixes must not be empty"));
        }
        if p.default_region.trim().is_empty() {
            return Err(ConfigError::invalid("default_region must not be empty"));
        }
        if self.worker.max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts must be at least 1"));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(format!("{key} must be a number, got '{value}'")))
}
