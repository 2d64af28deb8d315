//! Report → human/json string formatting.
//!
//! Two modes:
//! - **Human** (default): one banner and results block per strategy
//! - **JSON** (`--json`): `serde_json::to_string_pretty` of all reports

use counterbench_core::Error;
use counterbench_engine::StrategyReport;

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

const BANNER_WIDTH: usize = 50;

/// Format the reports of a whole benchmark run.
pub fn format_reports(reports: &[StrategyReport], mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(reports)
            .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e)),
        OutputMode::Human => reports
            .iter()
            .map(format_report_human)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Format an error.
pub fn format_error(err: &Error, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(&serde_json::json!({
            "error": format!("{}", err)
        }))
        .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", err)),
        OutputMode::Human => format!("(error) {}", err),
    }
}

fn format_report_human(report: &StrategyReport) -> String {
    let outcome = &report.outcome;
    let banner = "=".repeat(BANNER_WIDTH);
    let mut lines = vec![
        String::new(),
        banner.clone(),
        format!("Testing: {}", report.strategy.name()),
        banner,
        String::new(),
        "--- Results ---".to_string(),
        format!("Duration: {:.2} seconds", outcome.duration.as_secs_f64()),
        format!("Expected counter: {}", outcome.expected_total),
        format!("Actual counter: {}", outcome.final_counter),
        format!("Lost updates: {}", outcome.lost_updates),
        format!("Accuracy: {:.2}%", outcome.accuracy_percent),
        format!("Attempts: {}", report.attempts),
        format!("Conflicts: {}", report.conflicts),
    ];
    if outcome.is_double_counted() {
        lines.push("(warning) counter exceeds increments performed".to_string());
    }
    lines.join("\n")
}
