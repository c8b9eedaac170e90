//! Replay an edit script and print committed rows

use anyhow::{Context, Result};
use cli_lib::replay::{JsonLinesUpdater, ReplayReport, ReplaySession};
use cli_lib::script::{EditScript, RowSet};
use cli_lib::system_config::SystemConfig;
use coalescer::{CoalescerConfig, StatsSnapshot};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use survey_core::RowId;
use tracing::info;

pub struct ReplayArgs<'a> {
    pub script: &'a Path,
    pub rows: Option<&'a Path>,
    pub quiet_period_ms: Option<u64>,
    pub flush_at_end: bool,
    pub reject_rows: Vec<String>,
}

pub async fn run(config: &SystemConfig, args: ReplayArgs<'_>) -> Result<()> {
    let coalescer_config = match args.quiet_period_ms {
        Some(ms) => {
            let config = CoalescerConfig::with_quiet_period_ms(ms);
            config.validate().context("Invalid --quiet-period-ms")?;
            config
        }
        None => config.coalescer,
    };

    let script = EditScript::load(args.script)?;
    let mut rows = script.rows;
    if let Some(path) = args.rows {
        rows.extend(RowSet::load(path)?);
    }

    info!(
        script = %args.script.display(),
        steps = script.steps.len(),
        rows = rows.len(),
        quiet_period_ms = coalescer_config.quiet_period_ms,
        "Starting replay"
    );

    let updater = JsonLinesUpdater::new(Arc::new(Mutex::new(std::io::stdout())))
        .rejecting(args.reject_rows.into_iter().map(RowId::new));
    let session = ReplaySession::new(coalescer_config, rows, updater)?;
    let report = session.run(script.steps, args.flush_at_end).await;

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &ReplayReport) {
    eprintln!(
        "{} {} steps replayed in {}",
        "✓".green(),
        report.steps,
        format!("{}ms", report.elapsed_ms).dimmed()
    );

    for (kind, stats) in [
        ("reusable", &report.reusable),
        ("waste", &report.waste),
        ("hazardous_waste", &report.hazardous_waste),
    ] {
        if stats.edits == 0 && stats.resets == 0 {
            continue;
        }
        print_kind(kind, stats);
    }

    if report.flushed > 0 {
        eprintln!("  {} {}", "flushed".cyan(), report.flushed);
    }
    if report.commits_failed() > 0 {
        eprintln!(
            "{}",
            format!("{} commits failed (see log)", report.commits_failed()).yellow()
        );
    }
}

fn print_kind(kind: &str, stats: &StatsSnapshot) {
    eprintln!("{}", format!("[{}]", kind).yellow());
    eprintln!(
        "  {} = {} {}",
        "edits".cyan(),
        stats.edits,
        format!("({} superseded)", stats.superseded).dimmed()
    );
    eprintln!(
        "  {} = {} {}",
        "commits".cyan(),
        stats.commits,
        format!("({} failed)", stats.commits_failed).dimmed()
    );
    if stats.abandoned > 0 {
        eprintln!("  {} = {}", "abandoned".cyan(), stats.abandoned);
    }
    if stats.resets > 0 {
        eprintln!("  {} = {}", "resets".cyan(), stats.resets);
    }
}
