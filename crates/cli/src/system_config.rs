//! System-wide configuration for survey-edit
//!
//! Stored as TOML at `<config_dir>/survey-edit/config.toml`. The
//! `SURVEY_EDIT_CONFIG` environment variable points to another file.

use anyhow::{Context, Result};
use coalescer::CoalescerConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "SURVEY_EDIT_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub coalescer: CoalescerConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    /// Write daily-rotated log files here instead of stderr
    pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl LogConfig {
    pub fn level(&self) -> Result<Level> {
        Level::from_str(&self.level).map_err(|_| {
            anyhow::anyhow!(
                "Invalid log level '{}': expected trace, debug, info, warn or error",
                self.level
            )
        })
    }
}

impl SystemConfig {
    pub fn validate(&self) -> Result<()> {
        self.coalescer.validate()?;
        self.log.level()?;
        Ok(())
    }
}

/// Location of the config file
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join("survey-edit").join("config.toml"))
}

/// Load the config file, falling back to defaults when it does not exist
pub fn load() -> Result<SystemConfig> {
    let path = match config_file_path() {
        Some(path) => path,
        None => return Ok(SystemConfig::default()),
    };

    if !path.exists() {
        return Ok(SystemConfig::default());
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: SystemConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("Invalid config file: {}", path.display()))?;

    Ok(config)
}

/// Write the config file, creating its directory if needed
pub fn save(config: &SystemConfig) -> Result<()> {
    let path = config_file_path().context("Could not determine config file path")?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;
    Ok(())
}

/// Create the config file with defaults unless it already exists
pub fn init_if_missing() -> Result<PathBuf> {
    let path = config_file_path().context("Could not determine config file path")?;
    if !path.exists() {
        save(&SystemConfig::default())?;
    }
    Ok(path)
}

pub fn example_config() -> &'static str {
    r#"# survey-edit configuration

[coalescer]
# Delay between the last edit of a field and its commit (1-60000)
quiet_period_ms = 500

[log]
# trace, debug, info, warn or error
level = "info"
# Write daily-rotated log files to this directory instead of stderr
# directory = "/var/log/survey-edit"
"#
}
