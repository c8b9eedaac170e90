//! End-to-end tests of the survey-edit binary
//!
//! Scripts are replayed on the real clock with a short quiet period, with
//! edit bursts spaced far below it and settled edits far above it.

mod common;

use anyhow::Result;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &str) -> Result<String> {
    let path = dir.join(name);
    fs::write(&path, contents)?;
    Ok(path.display().to_string())
}

const ROWS: &str = r#"{
    "reusable": [{ "id": "r1", "title": "Oak door" }],
    "waste": [{ "id": "w1", "description": "Concrete" }],
    "hazardous_waste": [{ "id": "h1", "description": "Asbestos sheets" }]
}"#;

#[test]
fn test_burst_commits_once_per_field() -> Result<()> {
    let dir = TempDir::new()?;
    let rows = write(dir.path(), "rows.json", ROWS)?;
    let script = write(
        dir.path(),
        "burst.json",
        r#"{ "steps": [
            { "at_ms": 0,  "op": "edit", "kind": "waste", "row": "w1", "field": "wasteCode", "value": "1" },
            { "at_ms": 10, "op": "edit", "kind": "waste", "row": "w1", "field": "wasteCode", "value": "17" },
            { "at_ms": 20, "op": "edit", "kind": "waste", "row": "w1", "field": "wasteCode", "value": "1701" },
            { "at_ms": 30, "op": "edit", "kind": "waste", "row": "w1", "field": "wasteCode", "value": "170101" },
            { "at_ms": 30, "op": "edit", "kind": "reusable", "row": "r1", "field": "amount", "value": "3" }
        ] }"#,
    )?;

    let result = survey_edit!(
        dir.path(),
        "replay",
        &script,
        "--rows",
        &rows,
        "--quiet-period-ms",
        "200"
    )
    .assert_success()?;

    let commits = result.commits()?;
    assert_eq!(commits.len(), 2, "stdout: {}", result.stdout);

    let waste = commits
        .iter()
        .find(|c| c["kind"] == "waste")
        .expect("waste commit");
    assert_eq!(waste["row"], "w1");
    assert_eq!(waste["field"], "waste_code");
    assert_eq!(waste["record"]["waste_code"], "17 01 01");
    assert_eq!(waste["record"]["description"], "Concrete");

    let reusable = commits
        .iter()
        .find(|c| c["kind"] == "reusable")
        .expect("reusable commit");
    assert_eq!(reusable["record"]["amount"], 3.0);
    assert_eq!(reusable["record"]["title"], "Oak door");

    assert!(result.contains_stderr("steps replayed"));
    Ok(())
}

#[test]
fn test_settled_edits_each_commit() -> Result<()> {
    let dir = TempDir::new()?;
    let script = write(
        dir.path(),
        "settled.json",
        &format!(
            r#"{{ "rows": {}, "steps": [
                {{ "at_ms": 0,   "op": "edit", "kind": "hazardous_waste", "row": "h1", "field": "location", "value": "Attic" }},
                {{ "at_ms": 600, "op": "edit", "kind": "hazardous_waste", "row": "h1", "field": "location", "value": "Basement" }}
            ] }}"#,
            ROWS
        ),
    )?;

    let result = survey_edit!(dir.path(), "replay", &script, "--quiet-period-ms", "200")
        .assert_success()?;

    let locations: Vec<_> = result
        .commits()?
        .iter()
        .map(|c| c["record"]["location"].clone())
        .collect();
    assert_eq!(locations, vec!["Attic", "Basement"]);
    Ok(())
}

#[test]
fn test_abandon_all_discards_pending_edits() -> Result<()> {
    let dir = TempDir::new()?;
    let script = write(
        dir.path(),
        "abandon.json",
        &format!(
            r#"{{ "rows": {}, "steps": [
                {{ "at_ms": 0,  "op": "edit", "kind": "waste", "row": "w1", "field": "amount", "value": "5" }},
                {{ "at_ms": 0,  "op": "edit", "kind": "reusable", "row": "r1", "field": "notes", "value": "scratched" }},
                {{ "at_ms": 20, "op": "abandon_all" }}
            ] }}"#,
            ROWS
        ),
    )?;

    let result = survey_edit!(dir.path(), "replay", &script, "--quiet-period-ms", "200")
        .assert_success()?;

    assert!(result.commits()?.is_empty(), "stdout: {}", result.stdout);
    assert!(result.contains_stderr("abandoned"));
    Ok(())
}

#[test]
fn test_flush_at_end_skips_quiet_period() -> Result<()> {
    let dir = TempDir::new()?;
    let script = write(
        dir.path(),
        "flush.json",
        &format!(
            r#"{{ "rows": {}, "steps": [
                {{ "at_ms": 0, "op": "edit", "kind": "waste", "row": "w1", "field": "unit", "value": "m3" }}
            ] }}"#,
            ROWS
        ),
    )?;

    let result = survey_edit!(
        dir.path(),
        "replay",
        &script,
        "--quiet-period-ms",
        "60000",
        "--flush-at-end"
    )
    .assert_success()?;

    let commits = result.commits()?;
    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0]["record"]["unit"], "m3");
    assert!(result.duration.as_secs() < 30);
    Ok(())
}

#[test]
fn test_rejected_row_is_reported_not_retried() -> Result<()> {
    let dir = TempDir::new()?;
    let script = write(
        dir.path(),
        "reject.json",
        &format!(
            r#"{{ "rows": {}, "steps": [
                {{ "at_ms": 0, "op": "edit", "kind": "waste", "row": "w1", "field": "amount", "value": "5" }}
            ] }}"#,
            ROWS
        ),
    )?;

    let result = survey_edit!(
        dir.path(),
        "replay",
        &script,
        "--quiet-period-ms",
        "50",
        "--reject-row",
        "w1"
    )
    .assert_success()?;

    assert!(result.commits()?.is_empty());
    assert!(result.contains_stderr("1 commits failed"));
    Ok(())
}

#[test]
fn test_check_rejects_unknown_field() -> Result<()> {
    let dir = TempDir::new()?;
    let script = write(
        dir.path(),
        "bad.json",
        r#"{ "steps": [
            { "at_ms": 0, "op": "edit", "kind": "reusable", "row": "r1", "field": "wasteCode", "value": "1" }
        ] }"#,
    )?;

    let result = survey_edit!(dir.path(), "check", &script).assert_failure()?;
    assert!(result.contains_stderr("wasteCode"), "stderr: {}", result.stderr);
    Ok(())
}

#[test]
fn test_check_accepts_valid_script() -> Result<()> {
    let dir = TempDir::new()?;
    let script = write(
        dir.path(),
        "ok.json",
        r#"{ "steps": [
            { "at_ms": 0,   "op": "edit", "kind": "waste", "row": "w1", "field": "amount", "value": "1" },
            { "at_ms": 500, "op": "flush" }
        ] }"#,
    )?;

    let result = survey_edit!(dir.path(), "check", &script).assert_success()?;
    assert!(result.stdout.contains("is valid"));
    Ok(())
}

#[test]
fn test_config_set_and_get() -> Result<()> {
    let dir = TempDir::new()?;

    survey_edit!(dir.path(), "config", "set", "coalescer.quiet_period_ms", "250")
        .assert_success()?;
    let result = survey_edit!(dir.path(), "config", "get", "coalescer.quiet_period_ms")
        .assert_success()?;
    assert_eq!(result.stdout.trim(), "250");

    let saved = fs::read_to_string(dir.path().join("config.toml"))?;
    assert!(saved.contains("quiet_period_ms = 250"));
    Ok(())
}

#[test]
fn test_config_set_rejects_out_of_range() -> Result<()> {
    let dir = TempDir::new()?;

    survey_edit!(dir.path(), "config", "set", "coalescer.quiet_period_ms", "0")
        .assert_failure()?;
    survey_edit!(dir.path(), "config", "get", "nope").assert_failure()?;
    assert!(!dir.path().join("config.toml").exists());
    Ok(())
}

#[test]
fn test_config_path_create() -> Result<()> {
    let dir = TempDir::new()?;

    survey_edit!(dir.path(), "config", "path", "--create").assert_success()?;
    let result = survey_edit!(dir.path(), "config", "list").assert_success()?;

    assert!(dir.path().join("config.toml").exists());
    assert!(result.stdout.contains("quiet_period_ms"));
    Ok(())
}
