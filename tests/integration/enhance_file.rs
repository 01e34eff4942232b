//! File-level enrichment runs: loading, dedup by id, output replacement.

use crate::integration::support::ScriptedClient;
use gist::cli::enhance_file;
use gist::config::EnrichConfig;
use gist::record::{load_records, ENRICHMENT_FIELD};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn fast_config(workers: usize) -> EnrichConfig {
    let mut config = EnrichConfig::default();
    config.workers = workers;
    config.language = "English".to_string();
    config.retry.base_delay_ms = 0;
    config.retry.max_delay_ms = 0;
    config
}

fn write_input(dir: &Path, lines: &[&str]) -> std::path::PathBuf {
    let path = dir.join("2025-03-10.jsonl");
    fs::write(&path, lines.join("\n")).unwrap();
    path
}

fn read_output(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[tokio::test]
async fn test_duplicate_ids_keep_first_occurrence() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        dir.path(),
        &[
            r#"{"id":"a","title":"First A","summary":"Alpha first.","categories":["cs.CL"]}"#,
            r#"{"id":"b","title":"B","summary":"Beta."}"#,
            r#"{"id":"a","title":"Second A","summary":"Alpha second."}"#,
            "not json at all",
            r#"{"id":"c","title":"C"}"#,
        ],
    );

    let summary = enhance_file(
        &fast_config(2),
        Arc::new(ScriptedClient::echo()),
        &input,
        None,
        None,
    )
    .await
    .unwrap();

    assert_eq!(
        summary.output,
        dir.path().join("2025-03-10_AI_enhanced_English.jsonl")
    );
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.skipped_lines, 2);

    let rows = read_output(&summary.output);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], "a");
    assert_eq!(rows[0]["title"], "First A");
    assert_eq!(rows[0]["categories"][0], "cs.CL");
    assert_eq!(rows[0][ENRICHMENT_FIELD]["tldr"], "About Alpha");
    assert_eq!(rows[1]["id"], "b");
}

#[tokio::test]
async fn test_unknown_fields_survive_and_prior_enrichment_is_replaced() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        dir.path(),
        &[r#"{"id":"x","title":"X","summary":"Xylophones.","comment":"12 pages","AI":{"tldr":"stale"}}"#],
    );
    let output = dir.path().join("out.jsonl");
    let summary = enhance_file(
        &fast_config(1),
        Arc::new(ScriptedClient::echo()),
        &input,
        Some(&output),
        None,
    )
    .await
    .unwrap();
    assert_eq!(summary.output, output);

    let rows = read_output(&output);
    assert_eq!(rows[0]["comment"], "12 pages");
    assert_eq!(rows[0]["AI"]["tldr"], "About Xylophones.");
    assert_eq!(rows[0]["AI"].as_object().unwrap().len(), 5);
}

#[tokio::test]
async fn test_rerun_over_own_output_is_stable() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        dir.path(),
        &[
            r#"{"id":"1","title":"One","summary":"First paper."}"#,
            r#"{"id":"2","title":"Two","summary":"Second paper."}"#,
        ],
    );
    let config = fast_config(2);
    let first = enhance_file(&config, Arc::new(ScriptedClient::echo()), &input, None, None)
        .await
        .unwrap();
    let first_text = fs::read_to_string(&first.output).unwrap();

    let again = dir.path().join("again.jsonl");
    enhance_file(
        &config,
        Arc::new(ScriptedClient::echo()),
        &first.output,
        Some(&again),
        None,
    )
    .await
    .unwrap();
    assert_eq!(fs::read_to_string(&again).unwrap(), first_text);
    assert_eq!(load_records(&again).unwrap().records.len(), 2);
}

#[tokio::test]
async fn test_existing_target_is_replaced() {
    let dir = TempDir::new().unwrap();
    let input = write_input(dir.path(), &[r#"{"id":"1","title":"One","summary":"Only."}"#]);
    let output = dir.path().join("out.jsonl");
    fs::write(&output, "old line 1\nold line 2\nold line 3\n").unwrap();

    enhance_file(
        &fast_config(1),
        Arc::new(ScriptedClient::echo()),
        &input,
        Some(&output),
        None,
    )
    .await
    .unwrap();
    let rows = read_output(&output);
    assert_eq!(rows.len(), 1);
    assert!(!dir.path().join("out.jsonl.tmp").exists());
}

#[tokio::test]
async fn test_full_text_directory_feeds_the_prompt() {
    let dir = TempDir::new().unwrap();
    let texts = dir.path().join("texts");
    fs::create_dir(&texts).unwrap();
    fs::write(texts.join("hep-th_9901001.txt"), "Fulltext body of the paper.").unwrap();
    let input = write_input(
        dir.path(),
        &[r#"{"id":"hep-th/9901001","title":"Old style","summary":"Abstract only."}"#],
    );

    let client = Arc::new(ScriptedClient::echo());
    let summary = enhance_file(
        &fast_config(1),
        Arc::clone(&client) as _,
        &input,
        None,
        Some(&texts),
    )
    .await
    .unwrap();
    let rows = read_output(&summary.output);
    assert_eq!(rows[0]["AI"]["tldr"], "About Fulltext");
}

#[tokio::test]
async fn test_missing_input_is_fatal() {
    let dir = TempDir::new().unwrap();
    let err = enhance_file(
        &fast_config(1),
        Arc::new(ScriptedClient::echo()),
        &dir.path().join("absent.jsonl"),
        None,
        None,
    )
    .await
    .unwrap_err();
    assert!(err.is_fatal());
}
