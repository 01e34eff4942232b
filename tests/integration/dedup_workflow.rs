//! `gist dedup` through the CLI route table: statuses and exit codes.

use gist::cli::{Commands, RunContext};
use gist::config::EnrichConfig;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn dedup(ctx: &RunContext, dir: &Path, date: &str) -> gist::cli::CommandOutput {
    ctx.execute(&Commands::Dedup {
        data_dir: dir.to_path_buf(),
        date: Some(date.parse().unwrap()),
        history_days: 7,
    })
    .unwrap()
}

fn line(id: &str) -> String {
    format!(r#"{{"id":"{}","title":"T","summary":"S"}}"#, id)
}

#[test]
fn test_dedup_exit_codes_follow_status() {
    let ctx = RunContext::with_config(EnrichConfig::default(), None);
    let dir = TempDir::new().unwrap();

    let out = dedup(&ctx, dir.path(), "2025-03-10");
    assert_eq!(out.exit_code, 1);
    assert!(out.text.contains("no data"));

    fs::write(dir.path().join("2025-03-09.jsonl"), line("old")).unwrap();
    fs::write(
        dir.path().join("2025-03-10.jsonl"),
        [line("old"), line("new")].join("\n"),
    )
    .unwrap();
    let out = dedup(&ctx, dir.path(), "2025-03-10");
    assert_eq!(out.exit_code, 0);
    assert!(out.text.contains("removed 1 historical duplicate(s)"));

    fs::write(dir.path().join("2025-03-11.jsonl"), line("new")).unwrap();
    let out = dedup(&ctx, dir.path(), "2025-03-11");
    assert_eq!(out.exit_code, 1);
    assert!(!dir.path().join("2025-03-11.jsonl").exists());
}

#[test]
fn test_unreadable_day_file_exits_with_error_code() {
    let ctx = RunContext::with_config(EnrichConfig::default(), None);
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("2025-03-10.jsonl"), "{broken\n").unwrap();
    let out = dedup(&ctx, dir.path(), "2025-03-10");
    assert_eq!(out.exit_code, 2);
    assert!(out.text.starts_with("Deduplication failed"));
}

#[test]
fn test_stats_command_renders_counts() {
    let ctx = RunContext::with_config(EnrichConfig::default(), None);
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("day.jsonl");
    fs::write(&data, [line("a"), line("a"), line("b")].join("\n")).unwrap();
    let out = ctx
        .execute(&Commands::Stats {
            data: data.clone(),
            format: "json".to_string(),
        })
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&out.text).unwrap();
    assert_eq!(value["unique_ids"], 2);
    assert_eq!(value["duplicates"], 1);
}
