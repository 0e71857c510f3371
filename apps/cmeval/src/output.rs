//! Event-stream rendering

use std::io::Write;

use cmeval_errors::Error;
use cmeval_evaluator::EvalOutcome;
use cmeval_events::EventData;

/// One JSON object per line: every event in emission order, then the
/// run report.
pub fn write_json_events(outcome: &EvalOutcome, out: &mut impl Write) -> Result<(), Error> {
    for event in &outcome.events {
        let line = serde_json::to_string(event)?;
        writeln!(out, "{line}")?;
    }
    let report = serde_json::json!({ "report": outcome.report });
    writeln!(out, "{report}")?;
    Ok(())
}

/// Compact human summary: event counts by tag, diagnostics, verdict.
pub fn write_summary(outcome: &EvalOutcome, out: &mut impl Write) -> Result<(), Error> {
    let mut counts: std::collections::BTreeMap<&str, usize> = std::collections::BTreeMap::new();
    for event in &outcome.events {
        *counts.entry(event.tag()).or_default() += 1;
    }

    writeln!(out, "events:")?;
    for (tag, count) in &counts {
        writeln!(out, "  {tag:<32} {count}")?;
    }

    let diagnostics: Vec<_> = outcome
        .events
        .iter()
        .filter_map(|e| match &e.data {
            EventData::Diagnostic(d) => Some((&e.origin, d)),
            _ => None,
        })
        .collect();
    if !diagnostics.is_empty() {
        writeln!(out, "diagnostics:")?;
        for (origin, diag) in diagnostics {
            writeln!(
                out,
                "  [{severity:?}] {origin}: {cause}",
                severity = diag.severity,
                origin = origin,
                cause = diag.cause
            )?;
        }
    }

    let report = &outcome.report;
    writeln!(
        out,
        "result: {status:?} ({errors} errors, {warnings} warnings)",
        status = report.overall_status,
        errors = report.error_count,
        warnings = report.warning_count
    )?;
    Ok(())
}
