//! CLI presentation: text formatters per command.

use crate::config::ValidationError;
use crate::dedup::DedupStatus;
use crate::scheduler::RunReport;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use std::path::Path;

/// Summary printed after `gist enhance`.
pub fn format_run_report(
    output: &Path,
    report: &RunReport,
    skipped_lines: usize,
    duplicates: usize,
) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Records", "Generated", "Fallback", "Repaired", "Attempts", "Shrinks"]);
    table.add_row(vec![
        report.total.to_string(),
        report.generated.to_string(),
        report.fallbacks.to_string(),
        report.repaired.to_string(),
        report.attempts.to_string(),
        report.shrinks.to_string(),
    ]);

    let mut out = format!("Wrote {}\n\n{}\n", output.display(), table);
    if skipped_lines > 0 || duplicates > 0 {
        out.push_str(&format!(
            "\nInput: {} unusable line(s) skipped, {} duplicate id(s) dropped\n",
            skipped_lines, duplicates
        ));
    }
    if report.task_failures > 0 {
        out.push_str(&format!(
            "{} record(s) fell back after a task failure\n",
            report.task_failures
        ));
    }
    out.push_str(&format!("Elapsed: {:.1}s", report.duration_ms as f64 / 1000.0));
    out
}

pub fn format_dedup_status(day_file: &Path, status: &DedupStatus) -> String {
    match status {
        DedupStatus::HasNewContent { kept, removed: 0 } => {
            format!("{}: all {} record(s) are new", day_file.display(), kept)
        }
        DedupStatus::HasNewContent { kept, removed } => format!(
            "{}: removed {} historical duplicate(s), {} new record(s) remain",
            day_file.display(),
            removed,
            kept
        ),
        DedupStatus::NoNewContent { removed } => format!(
            "{}: all {} record(s) were seen before, file removed",
            day_file.display(),
            removed
        ),
        DedupStatus::NoData => format!("{}: no data", day_file.display()),
    }
}

pub fn format_validation_errors(errors: &[ValidationError]) -> String {
    let mut s = format!("Configuration has {} problem(s):", errors.len());
    for e in errors {
        s.push_str(&format!("\n  - {}", e));
    }
    s
}
