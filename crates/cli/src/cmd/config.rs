//! Configuration management command
//!
//! View and edit the survey-edit configuration file.

use anyhow::{Context, Result};
use cli_lib::system_config;
use coalescer::config::{MAX_QUIET_PERIOD_MS, MIN_QUIET_PERIOD_MS};
use owo_colors::OwoColorize;
use std::path::PathBuf;

/// List all configuration values
pub async fn run_list() -> Result<()> {
    let config = system_config::load()?;
    let config_path =
        system_config::config_file_path().context("Could not determine config file path")?;

    println!("{}", "Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    println!("{}", "[coalescer]".yellow());
    println!(
        "  {} = {} {}",
        "quiet_period_ms".cyan(),
        config.coalescer.quiet_period_ms,
        format!("({:.1}s)", config.coalescer.quiet_period_ms as f64 / 1000.0).dimmed()
    );

    println!("\n{}", "[log]".yellow());
    println!("  {} = {}", "level".cyan(), config.log.level);
    println!(
        "  {} = {}",
        "directory".cyan(),
        match &config.log.directory {
            Some(dir) => dir.display().to_string(),
            None => "(stderr)".dimmed().to_string(),
        }
    );

    println!("\n{}", "Valid Ranges:".bold());
    println!(
        "  quiet_period_ms: {}-{}",
        MIN_QUIET_PERIOD_MS, MAX_QUIET_PERIOD_MS
    );
    println!("  level: trace, debug, info, warn, error");

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(key: &str) -> Result<()> {
    let config = system_config::load()?;

    let value = match key {
        "coalescer.quiet_period_ms" => config.coalescer.quiet_period_ms.to_string(),
        "log.level" => config.log.level,
        "log.directory" => config
            .log
            .directory
            .map(|dir| dir.display().to_string())
            .unwrap_or_default(),
        _ => anyhow::bail!(
            "Unknown config key: {}. Use 'survey-edit config list' to see available keys.",
            key
        ),
    };

    println!("{}", value);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = system_config::load()?;

    match key {
        "coalescer.quiet_period_ms" => {
            let val: u64 = value
                .parse()
                .context("Invalid value: must be a positive integer")?;
            config.coalescer.quiet_period_ms = val;
        }
        "log.level" => {
            config.log.level = value.to_lowercase();
        }
        "log.directory" => {
            config.log.directory = if value.is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }
        _ => anyhow::bail!(
            "Unknown config key: {}. Use 'survey-edit config list' to see available keys.",
            key
        ),
    }

    config.validate().context("Invalid configuration value")?;
    system_config::save(&config)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(create: bool) -> Result<()> {
    let config_path =
        system_config::config_file_path().context("Could not determine config file path")?;

    if create && !config_path.exists() {
        system_config::init_if_missing()?;
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else {
        println!("{}", config_path.display());
        if !config_path.exists() {
            println!("{}", "File does not exist. Use --create to create it.".yellow());
        }
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", system_config::example_config());
    Ok(())
}
