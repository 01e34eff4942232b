//! End-to-end properties of the enrichment pipeline against scripted endpoints.

use crate::integration::support::{
    echo_reply, enricher, fast_settings, records, ScriptedClient, VALID_REPLY,
};
use gist::fallback::{fallback_tldr, is_fallback};
use gist::record::PaperRecord;
use gist::scheduler::{EnrichmentScheduler, SchedulerConfig};
use gist::types::{AttemptOutcome, OutcomeKind, SummarySource};
use gist::validate::ValidationStage;
use std::sync::Arc;

fn scheduler(client: Arc<ScriptedClient>, workers: usize) -> EnrichmentScheduler {
    EnrichmentScheduler::new(
        enricher(client, fast_settings()),
        SchedulerConfig {
            workers,
            record_timeout: None,
        },
    )
}

#[tokio::test]
async fn test_every_record_gets_five_nonempty_fields() {
    let mut input = records(6);
    input.push(PaperRecord::new("blank", "No abstract", ""));
    let client = Arc::new(ScriptedClient::new(|request, call| {
        Ok(match call % 3 {
            0 => AttemptOutcome::RateLimited,
            1 => AttemptOutcome::Success(echo_reply(&request.excerpt)),
            _ => AttemptOutcome::Success(
                r#"{"tldr":"t","motivation":"","method":"x","result":"r","conclusion":"c"}"#
                    .to_string(),
            ),
        })
    }));

    let (out, report) = scheduler(client, 3).run(input).await.unwrap();
    assert_eq!(out.len(), 7);
    assert_eq!(report.total, 7);
    for row in &out {
        for (name, value) in row.enrichment.fields() {
            assert!(!value.trim().is_empty(), "{} empty for {}", name, row.record.id);
        }
    }
}

#[tokio::test]
async fn test_always_failing_endpoint_yields_fallbacks() {
    let client = Arc::new(ScriptedClient::always(AttemptOutcome::TransportError(
        "connection reset".into(),
    )));
    let input = records(4);
    let (out, report) = scheduler(Arc::clone(&client), 2).run(input.clone()).await.unwrap();

    assert_eq!(report.fallbacks, 4);
    assert_eq!(report.generated, 0);
    assert_eq!(report.attempts, 12);
    assert_eq!(client.calls(), 12);
    for (row, record) in out.iter().zip(&input) {
        assert!(is_fallback(&row.enrichment));
        assert_eq!(row.enrichment.tldr, fallback_tldr(&record.abstract_text));
    }
}

#[tokio::test]
async fn test_prose_wrapped_reply_is_extracted() {
    let client = Arc::new(ScriptedClient::always(AttemptOutcome::Success(format!(
        "Sure! Here is the summary you asked for:\n{}\nLet me know if you need more.",
        VALID_REPLY
    ))));
    let (out, report) = scheduler(client, 1).run(records(1)).await.unwrap();
    assert_eq!(out[0].enrichment.tldr, "Short");
    assert_eq!(out[0].enrichment.conclusion, "So");
    assert_eq!(report.generated, 1);
    assert_eq!(report.repaired, 1);
}

#[tokio::test]
async fn test_capacity_then_success_uses_shorter_excerpt() {
    let client = Arc::new(ScriptedClient::new(|_, call| {
        Ok(if call == 1 {
            AttemptOutcome::CapacityExceeded
        } else {
            AttemptOutcome::Success(VALID_REPLY.to_string())
        })
    }));
    let long = PaperRecord::new("long", "Long", "word ".repeat(400));
    let enricher = enricher(Arc::clone(&client) as _, fast_settings());

    let outcome = enricher.enrich(&long).await.unwrap();
    assert_eq!(outcome.source, SummarySource::Generated);
    assert_eq!(outcome.stage, Some(ValidationStage::Strict));
    assert_eq!(outcome.attempts.len(), 2);
    assert_eq!(outcome.attempts[0].outcome, OutcomeKind::CapacityExceeded);

    let seen = client.seen.lock().clone();
    assert_eq!(seen.len(), 2);
    assert!(seen[1] < seen[0], "second excerpt {} not shorter than {}", seen[1], seen[0]);
}

#[tokio::test]
async fn test_excerpt_never_grows_within_a_record() {
    let client = Arc::new(ScriptedClient::new(|_, call| {
        Ok(match call {
            1 | 2 => AttemptOutcome::CapacityExceeded,
            3 => AttemptOutcome::RateLimited,
            _ => AttemptOutcome::CapacityExceeded,
        })
    }));
    let mut settings = fast_settings();
    settings.retry.max_attempts = 5;
    let enricher = enricher(Arc::clone(&client) as _, settings);

    let outcome = enricher
        .enrich(&PaperRecord::new("r", "R", "token ".repeat(700)))
        .await
        .unwrap();
    assert_eq!(outcome.source, SummarySource::Fallback);

    let lengths: Vec<usize> = outcome.attempts.iter().map(|a| a.excerpt_chars).collect();
    assert_eq!(lengths.len(), 5);
    assert!(lengths.windows(2).all(|w| w[1] <= w[0]), "{:?}", lengths);
    assert!(lengths.iter().all(|&n| n >= 50));
}

#[tokio::test]
async fn test_same_input_twice_gives_identical_output() {
    let first = scheduler(Arc::new(ScriptedClient::echo()), 4)
        .run(records(10))
        .await
        .unwrap()
        .0;
    let second = scheduler(Arc::new(ScriptedClient::echo()), 4)
        .run(records(10))
        .await
        .unwrap()
        .0;
    let a: Vec<String> = first.iter().map(|r| serde_json::to_string(r).unwrap()).collect();
    let b: Vec<String> = second.iter().map(|r| serde_json::to_string(r).unwrap()).collect();
    assert_eq!(a, b);
}
