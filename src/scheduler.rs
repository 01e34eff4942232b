//! Enrichment scheduler: bounded fan-out over the record set, ordered fan-in.
//!
//! Every record runs as its own task behind a semaphore of `workers` permits.
//! Results are slotted back by input index, so completion order never leaks
//! into the output. A task that panics or overruns its deadline still yields a
//! fallback summary. Only a fatal provider error stops the batch.

use crate::enrich::{Enricher, RecordOutcome};
use crate::error::EnrichError;
use crate::record::{EnrichedRecord, PaperRecord};
use crate::types::{OutcomeKind, SummarySource};
use crate::validate::ValidationStage;
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Concurrent records in flight (at least 1)
    pub workers: usize,
    /// Deadline for a whole record, retries included
    pub record_timeout: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            record_timeout: None,
        }
    }
}

/// Run summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub total: usize,
    pub generated: usize,
    pub fallbacks: usize,
    /// Generated replies that needed extraction or repair
    pub repaired: usize,
    pub attempts: usize,
    pub shrinks: usize,
    /// Records whose task panicked or timed out
    pub task_failures: usize,
    pub duration_ms: u64,
}

enum TaskResult {
    Done(RecordOutcome),
    Fatal(EnrichError),
    /// Carries whether content resolution had picked the full text
    Panicked(bool),
    TimedOut(bool),
}

/// Fans records out to the enricher and collects one result per record
pub struct EnrichmentScheduler {
    enricher: Arc<Enricher>,
    config: SchedulerConfig,
}

impl EnrichmentScheduler {
    pub fn new(enricher: Arc<Enricher>, config: SchedulerConfig) -> Self {
        Self { enricher, config }
    }

    /// Enrich every record, returning results in input order.
    pub async fn run(
        &self,
        records: Vec<PaperRecord>,
    ) -> Result<(Vec<EnrichedRecord>, RunReport), EnrichError> {
        let start = Instant::now();
        let total = records.len();
        let workers = self.config.workers.max(1);
        let records = Arc::new(records);
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut tasks = JoinSet::new();

        info!(total, workers, "Enrichment started");

        for index in 0..total {
            let records = Arc::clone(&records);
            let semaphore = Arc::clone(&semaphore);
            let enricher = Arc::clone(&self.enricher);
            let record_timeout = self.config.record_timeout;
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, TaskResult::Panicked(false));
                };
                let record = &records[index];
                let full_text_seen = AtomicBool::new(false);
                let work =
                    AssertUnwindSafe(enricher.enrich_tracked(record, &full_text_seen)).catch_unwind();
                let result = match record_timeout {
                    Some(limit) => match timeout(limit, work).await {
                        Ok(r) => r,
                        Err(_) => {
                            let seen = full_text_seen.load(Ordering::Relaxed);
                            return (index, TaskResult::TimedOut(seen));
                        }
                    },
                    None => work.await,
                };
                let result = match result {
                    Ok(Ok(outcome)) => TaskResult::Done(outcome),
                    Ok(Err(e)) => TaskResult::Fatal(e),
                    Err(_) => TaskResult::Panicked(full_text_seen.load(Ordering::Relaxed)),
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<RecordOutcome>> = vec![None; total];
        let mut report = RunReport {
            total,
            ..RunReport::default()
        };
        let mut completed = 0usize;
        let mut fallbacks = 0usize;

        while let Some(joined) = tasks.join_next().await {
            let (index, result) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    // Slot stays empty and is filled from the fallback below.
                    error!(error = %e, "Enrichment task failed to join");
                    continue;
                }
            };
            let record = &records[index];
            let outcome = match result {
                TaskResult::Done(outcome) => outcome,
                TaskResult::Fatal(e) => {
                    error!(record_id = %record.id, error = %e, "Fatal provider error, aborting run");
                    tasks.abort_all();
                    return Err(e);
                }
                TaskResult::Panicked(full_text) => {
                    warn!(record_id = %record.id, "Enrichment task panicked, using fallback summary");
                    report.task_failures += 1;
                    RecordOutcome::fallback_only(record, full_text)
                }
                TaskResult::TimedOut(full_text) => {
                    warn!(record_id = %record.id, "Record deadline exceeded, using fallback summary");
                    report.task_failures += 1;
                    RecordOutcome::fallback_only(record, full_text)
                }
            };

            completed += 1;
            if outcome.source == SummarySource::Fallback {
                fallbacks += 1;
            }
            info!(
                record_id = %record.id,
                completed,
                total,
                fallbacks,
                source = ?outcome.source,
                attempts = outcome.attempts.len(),
                "Record processed"
            );
            slots[index] = Some(outcome);
        }

        let records = Arc::try_unwrap(records).unwrap_or_else(|shared| (*shared).clone());
        let mut output = Vec::with_capacity(total);
        for (record, slot) in records.into_iter().zip(slots) {
            let outcome = slot.unwrap_or_else(|| {
                report.task_failures += 1;
                RecordOutcome::fallback_only(&record, false)
            });
            tally(&mut report, &outcome);
            output.push(EnrichedRecord {
                record,
                enrichment: outcome.summary,
            });
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            total = report.total,
            generated = report.generated,
            fallbacks = report.fallbacks,
            repaired = report.repaired,
            attempts = report.attempts,
            shrinks = report.shrinks,
            duration_ms = report.duration_ms,
            "Enrichment finished"
        );
        Ok((output, report))
    }
}

fn tally(report: &mut RunReport, outcome: &RecordOutcome) {
    match outcome.source {
        SummarySource::Generated => report.generated += 1,
        SummarySource::Fallback => report.fallbacks += 1,
    }
    if matches!(
        outcome.stage,
        Some(ValidationStage::Extracted | ValidationStage::Repaired)
    ) {
        report.repaired += 1;
    }
    report.attempts += outcome.attempts.len();
    report.shrinks += outcome
        .attempts
        .iter()
        .filter(|a| a.outcome == OutcomeKind::CapacityExceeded)
        .count();
}
