//! End-to-end processing of one paste.
//!
//! Reads the stored ledger, merges the pasted text into it, writes the ledger
//! back, then rebuilds the monthly and window views. Writes are sequential and
//! not transactional: if a view write fails, the ledger written before it
//! stays updated.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};

use ledger_core::error::{LedgerError, Result};
use ledger_core::models::{Measurement, WindowSpec};
use ledger_core::normalizer::{normalize_with_report, SkippedLine};
use ledger_core::time_utils::{format_date_key, Clock};

use crate::aggregator::{ReadingAggregator, WindowReport};
use crate::store::{LedgerStore, ViewSink};

// ── Public types ──────────────────────────────────────────────────────────────

/// Run-wide parameters of [`process_input`].
pub struct PipelineOptions<'a> {
    /// Reporting windows, in output order.
    pub windows: Vec<WindowSpec>,
    /// Timezone for window distances and the chart creation date.
    pub timezone: Tz,
    /// Source of the reference instant.
    pub clock: &'a dyn Clock,
}

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct ProcessSummary {
    /// The canonical ledger as written.
    pub records: Vec<Measurement>,
    /// Number of stored rows read before merging.
    pub existing_rows: usize,
    /// Dropped pasted lines and stored rows.
    pub skipped: Vec<SkippedLine>,
    /// Display names of the monthly views written.
    pub monthly_views: Vec<String>,
    /// One report per window and slot.
    pub window_reports: Vec<WindowReport>,
    /// Instant the windows were measured from.
    pub reference: DateTime<Utc>,
    /// Reference date as `yyyy/mm/dd` in the run's timezone.
    pub created_on: String,
}

/// Result of [`process_input`].
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// No valid record was found; nothing was written.
    NothingToProcess { skipped: Vec<SkippedLine> },
    Completed(ProcessSummary),
}

// ── Public function ───────────────────────────────────────────────────────────

/// Merge `raw_text` into the ledger and rebuild every view.
///
/// 1. Check that an owner name is configured.
/// 2. Read the stored rows and normalize them together with `raw_text`.
/// 3. Stop with [`ProcessOutcome::NothingToProcess`] when the result is empty.
/// 4. Overwrite the ledger.
/// 5. Split by month and slot and replace the monthly views.
/// 6. Build the window reports and replace the window views.
pub fn process_input(
    raw_text: &str,
    owner: &str,
    store: &mut dyn LedgerStore,
    views: &mut dyn ViewSink,
    options: &PipelineOptions<'_>,
) -> Result<ProcessOutcome> {
    let owner = owner.trim();
    if owner.is_empty() {
        return Err(LedgerError::MissingUserName);
    }

    // ── Step 1: Merge ─────────────────────────────────────────────────────────
    let existing = store.read_rows()?;
    let outcome = normalize_with_report(raw_text, &existing);

    if outcome.is_empty() {
        warn!("No valid blood-pressure data found; nothing written");
        return Ok(ProcessOutcome::NothingToProcess {
            skipped: outcome.skipped,
        });
    }

    // ── Step 2: Ledger ────────────────────────────────────────────────────────
    store.write_records(owner, &outcome.records)?;
    info!(
        "Ledger updated: {} records ({} stored rows read, {} lines skipped)",
        outcome.records.len(),
        existing.len(),
        outcome.skipped.len()
    );

    // ── Step 3: Monthly views ─────────────────────────────────────────────────
    let split = ReadingAggregator::split_by_month_and_slot(&outcome.records);
    let monthly_views = views.replace_monthly_views(&split)?;
    info!("Rebuilt {} monthly views", monthly_views.len());

    // ── Step 4: Window views ──────────────────────────────────────────────────
    let reference = options.clock.now();
    let created_on = format_date_key(reference, options.timezone);
    let window_reports = ReadingAggregator::build_window_reports(
        &split,
        &options.windows,
        reference,
        options.timezone,
    );
    views.replace_window_views(owner, &window_reports, &created_on)?;
    info!("Rebuilt {} window views", window_reports.len());

    Ok(ProcessOutcome::Completed(ProcessSummary {
        records: outcome.records,
        existing_rows: existing.len(),
        skipped: outcome.skipped,
        monthly_views,
        window_reports,
        reference,
        created_on,
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
