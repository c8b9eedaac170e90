//! Validate an edit script without replaying it

use anyhow::Result;
use cli_lib::script::{Action, EditScript};
use owo_colors::OwoColorize;
use std::path::Path;
use survey_core::RecordKind;

pub async fn run(script_path: &Path) -> Result<()> {
    let script = EditScript::load(script_path)?;

    println!(
        "{} {} is valid",
        "✓".green(),
        script_path.display().cyan()
    );
    println!(
        "  {} steps over {} {}",
        script.steps.len(),
        format!("{}ms", script.duration_ms()).bold(),
        format!("({} edits, {} rows)", script.edit_count(), script.rows.len()).dimmed()
    );

    for &kind in RecordKind::ALL {
        let edits = script
            .steps
            .iter()
            .filter(|step| match &step.action {
                Action::Edit(key, _) | Action::Reset(key, _) | Action::Abandon(key) => {
                    key.kind() == kind
                }
                Action::Flush | Action::AbandonAll => false,
            })
            .count();
        if edits > 0 {
            println!("  {:<16} {}", kind.cyan(), edits);
        }
    }

    Ok(())
}
