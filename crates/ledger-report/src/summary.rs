//! Text rendering of a processing run.

use ledger_core::normalizer::{LineSource, SkippedLine};
use ledger_data::aggregator::{WindowReport, WindowStatus};
use ledger_data::pipeline::ProcessSummary;

use crate::header::Header;
use crate::table::TextTable;

/// Warning shown when a run finds no valid reading.
pub const NO_VALID_DATA: &str = "有効な血圧データが見つかりませんでした。";

/// Human-readable origin of a skipped entry.
pub fn describe_source(source: LineSource) -> String {
    match source {
        LineSource::Pasted(line) => format!("input line {line}"),
        LineSource::Existing(index) => format!("stored row {}", index + 1),
    }
}

/// One line per skipped entry: origin, reason and the offending text.
pub fn render_skipped(skipped: &[SkippedLine]) -> Vec<String> {
    skipped
        .iter()
        .map(|s| format!("  {}: {} ({})", describe_source(s.source), s.reason, s.text))
        .collect()
}

/// Lines describing one window view.
pub fn render_window(report: &WindowReport, owner: &str, created_on: &str) -> Vec<String> {
    let mut lines = vec![format!("── {} ──", report.view_name())];

    match report.status {
        WindowStatus::Ready => {
            lines.extend(TextTable::for_readings(&report.rows).to_lines());
            let avg = &report.averages;
            lines.push(format!(
                "平均: 最高 {} / 最低 {} / 脈拍 {}",
                avg.systolic, avg.diastolic, avg.pulse
            ));
            lines.push(report.chart_title(owner, created_on));
        }
        WindowStatus::NoData | WindowStatus::NoDataInWindow => {
            lines.extend(report.empty_message());
        }
    }

    lines
}

/// Full report of a completed run.
pub fn render_completed(
    summary: &ProcessSummary,
    owner: &str,
    timezone: &str,
    show_skipped: bool,
) -> String {
    let mut lines = Header::new(owner, timezone).to_lines();

    lines.push(format!("Records:  {}", summary.records.len()));
    lines.push(format!("Skipped:  {}", summary.skipped.len()));
    if show_skipped {
        lines.extend(render_skipped(&summary.skipped));
    }
    lines.push(String::new());

    lines.push(format!("Monthly views ({}):", summary.monthly_views.len()));
    lines.extend(summary.monthly_views.iter().map(|name| format!("  {name}")));

    for report in &summary.window_reports {
        lines.push(String::new());
        lines.extend(render_window(report, owner, &summary.created_on));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Report of a run that found nothing to write.
pub fn render_nothing_to_process(skipped: &[SkippedLine], show_skipped: bool) -> String {
    let mut lines = vec![NO_VALID_DATA.to_string()];
    if show_skipped && !skipped.is_empty() {
        lines.push(format!("Skipped:  {}", skipped.len()));
        lines.extend(render_skipped(skipped));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
