//! Scheduler ordering, isolation, and abort behavior.

use crate::integration::support::{echo_reply, enricher, fast_settings, records, ScriptedClient};
use async_trait::async_trait;
use gist::content::{FullTextSource, FullTextUnavailable};
use gist::enrich::Enricher;
use gist::error::EnrichError;
use gist::fallback::is_fallback;
use gist::prompt::PromptBuilder;
use gist::provider::{CompletionOptions, GenerationClient};
use gist::record::PaperRecord;
use gist::scheduler::{EnrichmentScheduler, SchedulerConfig};
use gist::types::{AttemptOutcome, GenerationRequest};
use std::sync::Arc;
use std::time::Duration;

fn config(workers: usize) -> SchedulerConfig {
    SchedulerConfig {
        workers,
        record_timeout: None,
    }
}

#[tokio::test]
async fn test_worker_count_does_not_change_output() {
    let mut rendered = Vec::new();
    for workers in [1, 8] {
        let client = Arc::new(ScriptedClient::echo().with_jitter());
        let scheduler = EnrichmentScheduler::new(enricher(client, fast_settings()), config(workers));
        let (out, report) = scheduler.run(records(50)).await.unwrap();
        assert_eq!(report.total, 50);
        assert_eq!(report.generated, 50);
        rendered.push(
            out.iter()
                .map(|r| serde_json::to_string(r).unwrap())
                .collect::<Vec<_>>(),
        );
    }
    assert_eq!(rendered[0], rendered[1]);

    // Output order is input order.
    for (i, line) in rendered[1].iter().enumerate() {
        assert!(line.contains(&format!("\"2401.{:05}\"", i)));
        assert!(line.contains(&format!("About Topic{}", i)));
    }
}

#[tokio::test]
async fn test_panicking_record_falls_back_alone() {
    let client = Arc::new(ScriptedClient::new(|request, _| {
        if request.excerpt.starts_with("Topic3 ") {
            panic!("stub exploded");
        }
        Ok(AttemptOutcome::Success(echo_reply(&request.excerpt)))
    }));
    let scheduler = EnrichmentScheduler::new(enricher(client, fast_settings()), config(4));
    let (out, report) = scheduler.run(records(6)).await.unwrap();

    assert_eq!(out.len(), 6);
    assert_eq!(report.task_failures, 1);
    assert_eq!(report.fallbacks, 1);
    assert_eq!(report.generated, 5);
    assert!(is_fallback(&out[3].enrichment));
    assert_eq!(out[4].enrichment.tldr, "About Topic4");
}

#[tokio::test]
async fn test_auth_failure_aborts_the_run() {
    let client = Arc::new(ScriptedClient::new(|_, _| {
        Err(EnrichError::ProviderAuthFailed("401 invalid token".into()))
    }));
    let scheduler = EnrichmentScheduler::new(enricher(client, fast_settings()), config(2));
    let err = scheduler.run(records(5)).await.unwrap_err();
    assert!(matches!(err, EnrichError::ProviderAuthFailed(_)));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_empty_input_yields_empty_output() {
    let client = Arc::new(ScriptedClient::echo());
    let scheduler = EnrichmentScheduler::new(enricher(Arc::clone(&client) as _, fast_settings()), config(3));
    let (out, report) = scheduler.run(Vec::new()).await.unwrap();
    assert!(out.is_empty());
    assert_eq!(report.total, 0);
    assert_eq!(client.calls(), 0);
}

/// Hangs on one record, answers the rest immediately.
struct StallingClient;

#[async_trait]
impl GenerationClient for StallingClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
        _options: &CompletionOptions,
    ) -> Result<AttemptOutcome, EnrichError> {
        if request.excerpt.starts_with("Topic1 ") {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(AttemptOutcome::Success(echo_reply(&request.excerpt)))
    }

    fn provider_name(&self) -> &str {
        "stalling"
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

#[tokio::test(start_paused = true)]
async fn test_record_deadline_falls_back() {
    let scheduler = EnrichmentScheduler::new(
        enricher(Arc::new(StallingClient), fast_settings()),
        SchedulerConfig {
            workers: 2,
            record_timeout: Some(Duration::from_secs(30)),
        },
    );
    let (out, report) = scheduler.run(records(3)).await.unwrap();
    assert_eq!(report.task_failures, 1);
    assert!(is_fallback(&out[1].enrichment));
    assert_eq!(out[0].enrichment.tldr, "About Topic0");
    assert_eq!(out[2].enrichment.tldr, "About Topic2");
}

/// Full text that starts with the abstract, so scripted clients still key on it.
struct AbstractPlusBody;

#[async_trait]
impl FullTextSource for AbstractPlusBody {
    async fn fetch(&self, record: &PaperRecord) -> Result<String, FullTextUnavailable> {
        Ok(format!("{} Body of the paper.", record.abstract_text))
    }
}

#[tokio::test(start_paused = true)]
async fn test_deadline_fallback_keeps_full_text_note() {
    let enricher = Arc::new(Enricher::new(
        Arc::new(StallingClient),
        Arc::new(AbstractPlusBody),
        PromptBuilder::default(),
        fast_settings(),
    ));
    let scheduler = EnrichmentScheduler::new(
        enricher,
        SchedulerConfig {
            workers: 1,
            record_timeout: Some(Duration::from_secs(30)),
        },
    );
    let (out, report) = scheduler.run(records(2)).await.unwrap();
    assert_eq!(report.task_failures, 1);
    assert!(is_fallback(&out[1].enrichment));
    assert!(out[1].enrichment.conclusion.contains("see the full text"));
}
