//! Month/slot bucketing and rolling-window aggregation of readings.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use ledger_core::models::{Measurement, ReadingRow, Slot, WindowSpec};
use ledger_core::time_utils::day_distance;

// ── BucketKey ─────────────────────────────────────────────────────────────────

/// One monthly view: a calendar month and a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    pub year: i32,
    pub month: u32,
    pub slot: Slot,
}

impl BucketKey {
    pub fn for_date(date: NaiveDate, slot: Slot) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            slot,
        }
    }

    /// Display name, e.g. `2024/01/朝`.
    pub fn view_name(&self) -> String {
        format!("{:04}/{:02}/{}", self.year, self.month, self.slot.label())
    }

    /// File-system safe name, e.g. `2024-01-morning`.
    pub fn file_stem(&self) -> String {
        format!("{:04}-{:02}-{}", self.year, self.month, self.slot.file_stem())
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.view_name())
    }
}

// ── MonthlySplit ──────────────────────────────────────────────────────────────

/// Readings grouped per month and slot, plus all readings per slot.
#[derive(Debug, Clone, Default)]
pub struct MonthlySplit {
    /// One entry per month/slot that has at least one reading.
    pub buckets: BTreeMap<BucketKey, Vec<ReadingRow>>,
    /// Every reading of each slot across all months, sorted by date.
    pub by_slot: BTreeMap<Slot, Vec<ReadingRow>>,
}

impl MonthlySplit {
    /// All readings of `slot`, empty when there are none.
    pub fn slot_rows(&self, slot: Slot) -> &[ReadingRow] {
        self.by_slot.get(&slot).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ── Averages ──────────────────────────────────────────────────────────────────

/// Rounded per-value means of a set of readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Averages {
    pub systolic: i32,
    pub diastolic: i32,
    pub pulse: i32,
}

// ── WindowReport ──────────────────────────────────────────────────────────────

/// Whether a window view has anything to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStatus {
    /// The slot has no readings at all.
    NoData,
    /// The slot has readings, none inside the window.
    NoDataInWindow,
    Ready,
}

/// One window view: a window, a slot, its rows and their averages.
#[derive(Debug, Clone, Serialize)]
pub struct WindowReport {
    pub window: WindowSpec,
    pub slot: Slot,
    pub status: WindowStatus,
    pub rows: Vec<ReadingRow>,
    pub averages: Averages,
}

impl WindowReport {
    /// Display name, e.g. `1ヶ月朝`.
    pub fn view_name(&self) -> String {
        format!("{}{}", self.window.label, self.slot.label())
    }

    /// File-system safe name, e.g. `30d-morning`.
    pub fn file_stem(&self) -> String {
        format!("{}d-{}", self.window.days, self.slot.file_stem())
    }

    /// Title of the trend chart drawn for this view.
    pub fn chart_title(&self, owner: &str, created_on: &str) -> String {
        format!(
            "{}さんの{} - 血圧と脈拍の推移 (平均: 最高(赤) {} / 最低(青) {} / 脈拍(緑) {}) 【作成日: {}】",
            owner,
            self.view_name(),
            self.averages.systolic,
            self.averages.diastolic,
            self.averages.pulse,
            created_on
        )
    }

    /// Placeholder text for an empty view.
    pub fn empty_message(&self) -> Option<String> {
        match self.status {
            WindowStatus::NoData => Some("データがありません。".to_string()),
            WindowStatus::NoDataInWindow => {
                Some(format!("直近{}のデータがありません。", self.window.label))
            }
            WindowStatus::Ready => None,
        }
    }
}

// ── ReadingAggregator ─────────────────────────────────────────────────────────

/// Stateless helper that buckets and windows canonical readings.
pub struct ReadingAggregator;

impl ReadingAggregator {
    /// Group `records` by month and slot, and collect every slot's readings.
    ///
    /// Bucket rows keep input order; the per-slot lists are re-sorted by date
    /// so their order does not depend on the input.
    pub fn split_by_month_and_slot(records: &[Measurement]) -> MonthlySplit {
        let mut split = MonthlySplit::default();
        for slot in Slot::ALL {
            split.by_slot.insert(slot, Vec::new());
        }

        for record in records {
            let row = record.to_reading();
            split
                .buckets
                .entry(BucketKey::for_date(record.date, record.slot))
                .or_default()
                .push(row.clone());
            split.by_slot.entry(record.slot).or_default().push(row);
        }

        for rows in split.by_slot.values_mut() {
            rows.sort_by_key(|r| r.date);
        }

        split
    }

    /// Rows within `window_days` of `reference`, sorted by date.
    ///
    /// The distance is `ceil(|reference - start of row date| / 1 day)` and is
    /// symmetric, so rows dated after `reference` pass when close enough.
    pub fn window_rows(
        rows: &[ReadingRow],
        window_days: u32,
        reference: DateTime<Utc>,
        tz: Tz,
    ) -> Vec<ReadingRow> {
        let mut kept: Vec<ReadingRow> = rows
            .iter()
            .filter(|r| day_distance(reference, r.date, tz) <= i64::from(window_days))
            .cloned()
            .collect();
        kept.sort_by_key(|r| r.date);
        kept
    }

    /// Rounded means of systolic, diastolic and pulse.
    ///
    /// Each value is averaged over the rows that carry it, so a missing pulse
    /// only drops that row from the pulse mean. A value with no samples
    /// averages to zero. Rows are not required to carry all three values, so
    /// a lone `{100, 60, -}` averages to `{100, 60, 0}` rather than all zeros.
    pub fn average(rows: &[ReadingRow]) -> Averages {
        let mut sum_sys: i64 = 0;
        let mut sum_dia: i64 = 0;
        let mut sum_pulse: i64 = 0;
        let mut pulse_count: i64 = 0;

        for row in rows {
            sum_sys += i64::from(row.systolic);
            sum_dia += i64::from(row.diastolic);
            if let Some(pulse) = row.pulse {
                sum_pulse += i64::from(pulse);
                pulse_count += 1;
            }
        }

        Averages {
            systolic: rounded_mean(sum_sys, rows.len() as i64),
            diastolic: rounded_mean(sum_dia, rows.len() as i64),
            pulse: rounded_mean(sum_pulse, pulse_count),
        }
    }

    /// One report per window and slot, in window order, Morning first.
    pub fn build_window_reports(
        split: &MonthlySplit,
        windows: &[WindowSpec],
        reference: DateTime<Utc>,
        tz: Tz,
    ) -> Vec<WindowReport> {
        let mut reports = Vec::with_capacity(windows.len() * Slot::ALL.len());

        for window in windows {
            for slot in Slot::ALL {
                let all = split.slot_rows(slot);
                let rows = Self::window_rows(all, window.days, reference, tz);
                let status = if all.is_empty() {
                    WindowStatus::NoData
                } else if rows.is_empty() {
                    WindowStatus::NoDataInWindow
                } else {
                    WindowStatus::Ready
                };
                let averages = Self::average(&rows);
                reports.push(WindowReport {
                    window: window.clone(),
                    slot,
                    status,
                    rows,
                    averages,
                });
            }
        }

        reports
    }
}

/// Mean rounded half away from zero; zero when there are no samples.
fn rounded_mean(sum: i64, count: i64) -> i32 {
    if count == 0 {
        return 0;
    }
    (sum as f64 / count as f64).round() as i32
}

// ── Tests ─────────────────────────────────────────────────────────────────────
