//! survey-edit CLI
//!
//! Replays timed edit scripts against demolition survey rows through the
//! debounced edit coalescer, printing every committed row update as a JSON
//! line on stdout.

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli_lib::{logging, system_config};
use std::path::PathBuf;
use tracing::Level;

mod cmd;

/// survey-edit - Debounced editing of demolition survey items
#[derive(Parser)]
#[command(name = "survey-edit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an edit script and print committed rows as JSON lines
    Replay {
        /// Edit script (JSON)
        script: PathBuf,
        /// Additional rows file (JSON, grouped by kind)
        #[arg(long)]
        rows: Option<PathBuf>,
        /// Override the configured quiet period
        #[arg(long)]
        quiet_period_ms: Option<u64>,
        /// Commit whatever is pending right after the last step
        #[arg(long)]
        flush_at_end: bool,
        /// Refuse updates to this row id (repeatable)
        #[arg(long = "reject-row", value_name = "ROW")]
        reject_rows: Vec<String>,
    },
    /// Validate an edit script without replaying it
    Check {
        /// Edit script (JSON)
        script: PathBuf,
    },
    /// View and edit configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List,
    /// Get a single value (e.g. coalescer.quiet_period_ms)
    Get { key: String },
    /// Set a single value
    Set { key: String, value: String },
    /// Show the config file path
    Path {
        /// Create the file with defaults if missing
        #[arg(long)]
        create: bool,
    },
    /// Print an example configuration
    Example,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Default logging on a broken config file; `config path` still works
    let loaded = system_config::load();
    let (level, directory) = match &loaded {
        Ok(config) => (config.log.level()?, config.log.directory.clone()),
        Err(_) => (Level::INFO, None),
    };
    let _guard = logging::init(
        logging::effective_level(level, cli.verbose),
        directory.as_deref(),
    )?;

    match cli.command {
        Commands::Replay {
            script,
            rows,
            quiet_period_ms,
            flush_at_end,
            reject_rows,
        } => {
            let config = loaded?;
            cmd::replay::run(
                &config,
                cmd::replay::ReplayArgs {
                    script: &script,
                    rows: rows.as_deref(),
                    quiet_period_ms,
                    flush_at_end,
                    reject_rows,
                },
            )
            .await
        }
        Commands::Check { script } => cmd::check::run(&script).await,
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List => cmd::config::run_list().await,
            ConfigCommands::Get { key } => cmd::config::run_get(&key).await,
            ConfigCommands::Set { key, value } => cmd::config::run_set(&key, &value).await,
            ConfigCommands::Path { create } => cmd::config::run_path(create).await,
            ConfigCommands::Example => cmd::config::run_example().await,
        },
    }
}
