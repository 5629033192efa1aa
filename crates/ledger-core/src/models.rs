use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `strftime` pattern of the canonical date key, e.g. `2024/01/31`.
pub const DATE_KEY_FORMAT: &str = "%Y/%m/%d";

/// Header row of the canonical ledger table.
pub const LEDGER_HEADERS: [&str; 5] = ["日付", "時刻", "最高血圧", "最低血圧", "脈拍"];

/// Header row of every monthly and window view.
pub const VIEW_HEADERS: [&str; 4] = ["日付", "最高血圧", "最低血圧", "脈拍"];

/// Title written above the ledger table for `owner`.
pub fn ledger_title(owner: &str) -> String {
    format!("{}さんの血圧の記録", owner)
}

// ── Slot ──────────────────────────────────────────────────────────────────────

/// Time-of-day classification of a measurement.
///
/// The declaration order is the canonical sort order: Morning sorts before
/// Evening regardless of how the labels compare as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Slot {
    #[serde(rename = "朝")]
    Morning,
    #[serde(rename = "夜")]
    Evening,
}

impl Slot {
    /// Both slots in canonical order.
    pub const ALL: [Slot; 2] = [Slot::Morning, Slot::Evening];

    /// Display label stored in the ledger's time column.
    pub fn label(self) -> &'static str {
        match self {
            Slot::Morning => "朝",
            Slot::Evening => "夜",
        }
    }

    /// ASCII name used in view file names.
    pub fn file_stem(self) -> &'static str {
        match self {
            Slot::Morning => "morning",
            Slot::Evening => "evening",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Measurement ───────────────────────────────────────────────────────────────

/// Identity of a measurement: at most one record exists per day and slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    pub date: NaiveDate,
    pub slot: Slot,
}

/// One canonical blood-pressure reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    /// Calendar date of the reading (no time of day).
    pub date: NaiveDate,
    /// Morning or evening.
    pub slot: Slot,
    /// Systolic pressure in mmHg.
    pub systolic: i32,
    /// Diastolic pressure in mmHg.
    pub diastolic: i32,
    /// Heart rate in bpm, when the device reported one.
    pub pulse: Option<i32>,
}

impl Measurement {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            date: self.date,
            slot: self.slot,
        }
    }

    /// The date formatted as `yyyy/mm/dd`.
    pub fn date_key(&self) -> String {
        self.date.format(DATE_KEY_FORMAT).to_string()
    }

    /// The four-column row used by monthly and window views.
    pub fn to_reading(&self) -> ReadingRow {
        ReadingRow {
            date: self.date,
            systolic: self.systolic,
            diastolic: self.diastolic,
            pulse: self.pulse,
        }
    }

    /// The five-column ledger row as written by the store writer.
    pub fn to_raw_row(&self) -> RawRow {
        RawRow(vec![
            CellValue::Text(self.date_key()),
            CellValue::Text(self.slot.label().to_string()),
            CellValue::Number(f64::from(self.systolic)),
            CellValue::Number(f64::from(self.diastolic)),
            self.pulse
                .map(|p| CellValue::Number(f64::from(p)))
                .unwrap_or(CellValue::Empty),
        ])
    }
}

/// A measurement without its slot, as shown in per-slot views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingRow {
    pub date: NaiveDate,
    pub systolic: i32,
    pub diastolic: i32,
    pub pulse: Option<i32>,
}

impl ReadingRow {
    /// The date formatted as `yyyy/mm/dd`.
    pub fn date_key(&self) -> String {
        self.date.format(DATE_KEY_FORMAT).to_string()
    }
}

// ── Reporting windows ─────────────────────────────────────────────────────────

/// Window lengths used when none are configured: 1, 3, 6 and 12 months.
pub const DEFAULT_WINDOW_DAYS: [u32; 4] = [30, 90, 180, 365];

/// A named rolling window measured in days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub days: u32,
    pub label: String,
}

impl WindowSpec {
    /// Build a window, labelling the standard lengths by month.
    pub fn new(days: u32) -> Self {
        let label = match days {
            30 => "1ヶ月".to_string(),
            90 => "3ヶ月".to_string(),
            180 => "6ヶ月".to_string(),
            365 => "1年".to_string(),
            n => format!("{}日", n),
        };
        Self { days, label }
    }

    /// The four standard windows.
    pub fn defaults() -> Vec<WindowSpec> {
        DEFAULT_WINDOW_DAYS.iter().map(|&d| WindowSpec::new(d)).collect()
    }

    /// Parse a comma-separated list of day counts such as `"30,90"`.
    pub fn parse_list(spec: &str) -> crate::error::Result<Vec<WindowSpec>> {
        let mut windows = Vec::new();
        for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let days: u32 = part
                .parse()
                .map_err(|_| crate::error::LedgerError::InvalidWindow(part.to_string()))?;
            if days == 0 {
                return Err(crate::error::LedgerError::InvalidWindow(part.to_string()));
            }
            windows.push(WindowSpec::new(days));
        }
        if windows.is_empty() {
            return Err(crate::error::LedgerError::InvalidWindow(spec.to_string()));
        }
        Ok(windows)
    }
}

// ── Stored cells ──────────────────────────────────────────────────────────────

/// A single cell as it comes back from the store.
///
/// Deserialization is untagged and tried in declaration order: `null` is
/// empty, an ISO `yyyy-mm-dd` string is a structured date, any number is a
/// number and every other string is display text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Date(NaiveDate),
    Number(f64),
    Text(String),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// `true` for null cells and blank text.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Integer value of a numeric cell or a numeric-looking text cell.
    ///
    /// Non-integral numbers are rejected rather than truncated.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() <= f64::from(i32::MAX) => {
                Some(*n as i32)
            }
            CellValue::Text(s) => crate::normalizer::parse_leading_int(s.trim()),
            _ => None,
        }
    }

    /// Text representation used when a cell has to be re-parsed as a token.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Date(d) => Some(d.format(DATE_KEY_FORMAT).to_string()),
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::Text(s) => Some(s.clone()),
        }
    }
}

/// A positional row read from the ledger table (date, time, sys, dia, pulse).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRow(pub Vec<CellValue>);

impl RawRow {
    /// Cell at `index`, or an empty cell when the row is shorter.
    pub fn cell(&self, index: usize) -> &CellValue {
        self.0.get(index).unwrap_or(&EMPTY_CELL)
    }
}

impl From<Vec<CellValue>> for RawRow {
    fn from(cells: Vec<CellValue>) -> Self {
        RawRow(cells)
    }
}
