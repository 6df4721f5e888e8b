//! Operational configuration
//!
//! Maps to the YAML configuration file (`config.yaml`), with loading,
//! validation, and defaults. Secret material (OAuth refresh tokens, Telegram
//! session bytes) never lives here — see `cloudweave-crypto` for the
//! separate encrypted `config.json.enc` envelope.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level operational configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub sync: SyncConfig,
    pub capacity: CapacityConfig,
    pub scan: ScanConfig,
    pub rate_limiting: RateLimitingConfig,
    pub logging: LoggingConfig,
}

/// Core sync-loop behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// When true, every mutating operation is logged but not executed (I6).
    pub safe_mode: bool,
    /// When true, a single failed operation aborts the rest of the run;
    /// when false, the run logs the failure and continues with the next item.
    pub stop_on_error: bool,
    /// Seconds between automatic `run` loop iterations.
    pub interval_seconds: u64,
}

/// Capacity engine watermarks and provider priority (§5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityConfig {
    /// Usage fraction (0-100) above which an account is "overloaded".
    pub high_watermark_percent: u8,
    /// Usage fraction (0-100) a rebalance aims to bring an account down to.
    pub target_watermark_percent: u8,
    /// Consecutive transfer failures before an account is dropped as a
    /// rebalance source for the remainder of the run.
    pub max_consecutive_failures: u32,
}

/// Scanner concurrency and batching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Rows buffered before the single writer task flushes to the store.
    pub batch_size: usize,
    /// Seconds of inactivity before the writer task flushes a partial batch.
    pub flush_interval_seconds: u64,
    /// Per-account scan deadline; accounts exceeding it are cancelled and
    /// logged rather than stalling the whole run.
    pub account_timeout_seconds: u64,
}

/// Per-provider outbound request rate limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    pub google_requests_per_second: u32,
    pub microsoft_requests_per_second: u32,
    pub telegram_requests_per_second: u32,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Path to the log file; `None` logs to stderr only.
    pub file: Option<PathBuf>,
    pub json: bool,
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/cloudweave/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("cloudweave")
            .join("config.yaml")
    }

    /// Default path of the encrypted credential envelope, alongside the
    /// operational config file.
    pub fn default_secrets_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("cloudweave")
            .join("config.json.enc")
    }

    /// Default path of the encrypted metadata store.
    pub fn default_store_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("cloudweave")
            .join("metadata.db")
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            safe_mode: false,
            stop_on_error: false,
            interval_seconds: 300,
        }
    }
}

impl Default for CapacityConfig {
    fn default() -> Self {
        Self {
            high_watermark_percent: 95,
            target_watermark_percent: 90,
            max_consecutive_failures: 2,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            flush_interval_seconds: 2,
            account_timeout_seconds: 600,
        }
    }
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            google_requests_per_second: 5,
            microsoft_requests_per_second: 10,
            telegram_requests_per_second: 20,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            json: false,
        }
    }
}

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"capacity.high_watermark_percent"`.
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validates the configuration and returns all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.sync.interval_seconds == 0 {
            errors.push(ValidationError {
                field: "sync.interval_seconds".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.capacity.high_watermark_percent > 100 {
            errors.push(ValidationError {
                field: "capacity.high_watermark_percent".into(),
                message: "must be in range 0..=100".into(),
            });
        }
        if self.capacity.target_watermark_percent > 100 {
            errors.push(ValidationError {
                field: "capacity.target_watermark_percent".into(),
                message: "must be in range 0..=100".into(),
            });
        }
        if self.capacity.target_watermark_percent >= self.capacity.high_watermark_percent {
            errors.push(ValidationError {
                field: "capacity.target_watermark_percent".into(),
                message: format!(
                    "target_watermark_percent ({}) must be lower than high_watermark_percent ({})",
                    self.capacity.target_watermark_percent, self.capacity.high_watermark_percent
                ),
            });
        }
        if self.capacity.max_consecutive_failures == 0 {
            errors.push(ValidationError {
                field: "capacity.max_consecutive_failures".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.scan.batch_size == 0 {
            errors.push(ValidationError {
                field: "scan.batch_size".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.scan.flush_interval_seconds == 0 {
            errors.push(ValidationError {
                field: "scan.flush_interval_seconds".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.rate_limiting.google_requests_per_second == 0 {
            errors.push(ValidationError {
                field: "rate_limiting.google_requests_per_second".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.rate_limiting.microsoft_requests_per_second == 0 {
            errors.push(ValidationError {
                field: "rate_limiting.microsoft_requests_per_second".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.rate_limiting.telegram_requests_per_second == 0 {
            errors.push(ValidationError {
                field: "rate_limiting.telegram_requests_per_second".into(),
                message: "must be greater than 0".into(),
            });
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn target_watermark_must_be_below_high_watermark() {
        let mut config = Config::default();
        config.capacity.target_watermark_percent = 95;
        config.capacity.high_watermark_percent = 95;
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "capacity.target_watermark_percent"));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "logging.level"));
    }
}
