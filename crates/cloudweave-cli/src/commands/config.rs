//! Config command - view and manage cloudweave configuration
//!
//! Provides the `cloudweave config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors

use anyhow::{Context, Result};
use clap::Subcommand;

use cloudweave_core::config::Config;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show {
        /// Use an alternate config file path instead of the platform default.
        #[arg(long)]
        config: Option<String>,
    },
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "sync.safe_mode")
        key: String,
        /// New value
        value: String,
        #[arg(long)]
        config: Option<String>,
    },
    /// Validate configuration file
    Validate {
        #[arg(long)]
        config: Option<String>,
    },
}

impl ConfigCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show { config } => Self::execute_show(config.clone(), format),
            ConfigCommand::Set { key, value, config } => Self::execute_set(config.clone(), key, value, format),
            ConfigCommand::Validate { config } => Self::execute_validate(config.clone(), format),
        }
    }

    fn execute_show(config_path: Option<String>, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format == OutputFormat::Json);
        let path = config_path.map(std::path::PathBuf::from).unwrap_or_else(Config::default_path);
        let config = Config::load_or_default(&path);

        if format == OutputFormat::Json {
            formatter.print_json(&serde_json::to_value(&config)?);
        } else {
            formatter.info(&format!("config file: {}", path.display()));
            let yaml = serde_yaml::to_string(&config)?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }
        Ok(())
    }

    fn execute_set(config_path: Option<String>, key: &str, value: &str, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format == OutputFormat::Json);
        let path = config_path.map(std::path::PathBuf::from).unwrap_or_else(Config::default_path);
        let mut config = Config::load_or_default(&path);

        apply_config_value(&mut config, key, value)?;

        let errors = config.validate();
        if !errors.is_empty() {
            for e in &errors {
                formatter.error(&e.to_string());
            }
            anyhow::bail!("refusing to save an invalid configuration");
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_yaml::to_string(&config)?)
            .with_context(|| format!("failed to write {}", path.display()))?;

        formatter.success(&format!("set {key} = {value}"));
        Ok(())
    }

    fn execute_validate(config_path: Option<String>, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format == OutputFormat::Json);
        let path = config_path.map(std::path::PathBuf::from).unwrap_or_else(Config::default_path);
        let config = Config::load(&path).with_context(|| format!("failed to load {}", path.display()))?;

        let errors = config.validate();
        if errors.is_empty() {
            formatter.success("configuration is valid");
        } else {
            for e in &errors {
                formatter.error(&e.to_string());
            }
            anyhow::bail!("{} validation error(s)", errors.len());
        }
        Ok(())
    }
}

/// Supported dot-notation keys for `config set`.
const SUPPORTED_KEYS: &[&str] = &[
    "sync.safe_mode",
    "sync.stop_on_error",
    "sync.interval_seconds",
    "capacity.high_watermark_percent",
    "capacity.target_watermark_percent",
    "capacity.max_consecutive_failures",
    "scan.batch_size",
    "scan.flush_interval_seconds",
    "scan.account_timeout_seconds",
    "rate_limiting.google_requests_per_second",
    "rate_limiting.microsoft_requests_per_second",
    "rate_limiting.telegram_requests_per_second",
    "logging.level",
    "logging.file",
    "logging.json",
];

fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "sync.safe_mode" => config.sync.safe_mode = parse_bool(value)?,
        "sync.stop_on_error" => config.sync.stop_on_error = parse_bool(value)?,
        "sync.interval_seconds" => config.sync.interval_seconds = parse_u64(value)?,
        "capacity.high_watermark_percent" => config.capacity.high_watermark_percent = parse_u8(value)?,
        "capacity.target_watermark_percent" => config.capacity.target_watermark_percent = parse_u8(value)?,
        "capacity.max_consecutive_failures" => config.capacity.max_consecutive_failures = parse_u32(value)?,
        "scan.batch_size" => config.scan.batch_size = parse_usize(value)?,
        "scan.flush_interval_seconds" => config.scan.flush_interval_seconds = parse_u64(value)?,
        "scan.account_timeout_seconds" => config.scan.account_timeout_seconds = parse_u64(value)?,
        "rate_limiting.google_requests_per_second" => config.rate_limiting.google_requests_per_second = parse_u32(value)?,
        "rate_limiting.microsoft_requests_per_second" => config.rate_limiting.microsoft_requests_per_second = parse_u32(value)?,
        "rate_limiting.telegram_requests_per_second" => config.rate_limiting.telegram_requests_per_second = parse_u32(value)?,
        "logging.level" => config.logging.level = value.to_string(),
        "logging.file" => config.logging.file = if value.is_empty() { None } else { Some(value.into()) },
        "logging.json" => config.logging.json = parse_bool(value)?,
        _ => anyhow::bail!("unknown config key '{key}', supported keys: {}", SUPPORTED_KEYS.join(", ")),
    }
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool> {
    value.parse().with_context(|| format!("'{value}' is not a valid bool"))
}

fn parse_u64(value: &str) -> Result<u64> {
    value.parse().with_context(|| format!("'{value}' is not a valid integer"))
}

fn parse_u32(value: &str) -> Result<u32> {
    value.parse().with_context(|| format!("'{value}' is not a valid integer"))
}

fn parse_u8(value: &str) -> Result<u8> {
    value.parse().with_context(|| format!("'{value}' is not a valid integer"))
}

fn parse_usize(value: &str) -> Result<usize> {
    value.parse().with_context(|| format!("'{value}' is not a valid integer"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sets_bool_key() {
        let mut config = Config::default();
        apply_config_value(&mut config, "sync.safe_mode", "true").unwrap();
        assert!(config.sync.safe_mode);
    }

    #[test]
    fn sets_integer_key() {
        let mut config = Config::default();
        apply_config_value(&mut config, "capacity.high_watermark_percent", "80").unwrap();
        assert_eq!(config.capacity.high_watermark_percent, 80);
    }

    #[test]
    fn rejects_unknown_key() {
        let mut config = Config::default();
        assert!(apply_config_value(&mut config, "sync.root", "/tmp").is_err());
    }

    #[test]
    fn rejects_invalid_value() {
        let mut config = Config::default();
        assert!(apply_config_value(&mut config, "sync.interval_seconds", "not-a-number").is_err());
    }

    #[test]
    fn clears_log_file_on_empty_string() {
        let mut config = Config::default();
        config.logging.file = Some("/tmp/log".into());
        apply_config_value(&mut config, "logging.file", "").unwrap();
        assert!(config.logging.file.is_none());
    }
}
