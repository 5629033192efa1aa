//! Record normalizer: turns pasted measurement text into canonical records.
//!
//! Each non-blank line is parsed independently. Lines that cannot be turned
//! into a [`Measurement`] are dropped; the reason is kept in a
//! [`SkippedLine`] so callers can show it, but nothing is raised.
//!
//! Merging is last-write-wins per [`RecordKey`]: previously stored rows seed
//! the map, then pasted lines overwrite in the order they appear.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::models::{Measurement, RawRow, RecordKey, Slot};

// ── Token tables ──────────────────────────────────────────────────────────────

/// Replacements applied to the date field before it is split on `/`.
pub const DATE_TOKENS: &[(&str, &str)] = &[("年", "/"), ("月", "/"), ("日", ""), ("-", "/")];

/// Replacements applied to the time field before the hour is read.
pub const TIME_TOKENS: &[(&str, &str)] = &[("時", ":"), ("分", "")];

/// Literal markers that name a slot directly. Checked in order, first hit wins.
pub const SLOT_MARKERS: &[(&str, Slot)] = &[
    ("朝", Slot::Morning),
    ("夜", Slot::Evening),
    ("morning", Slot::Morning),
    ("evening", Slot::Evening),
];

/// Minimum number of comma-separated fields: date, time, systolic, diastolic.
const MIN_FIELDS: usize = 4;

// ── Diagnostics ───────────────────────────────────────────────────────────────

/// Why a line or stored row was dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    #[error("expected at least 4 comma-separated fields, found {0}")]
    FieldCount(usize),

    #[error("systolic/diastolic are not numbers")]
    InvalidPressure,

    #[error("unrecognised date {0:?}")]
    InvalidDate(String),

    #[error("unrecognised time {0:?}")]
    UnrecognisedTime(String),

    #[error("hour {0} is outside the morning (4-11) and evening (18-3) ranges")]
    AmbiguousHour(i32),
}

/// Where a skipped entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSource {
    /// 1-based line number within the pasted text.
    Pasted(usize),
    /// 0-based row index within the previously stored ledger.
    Existing(usize),
}

/// One dropped line together with its reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    pub source: LineSource,
    pub text: String,
    pub reason: SkipReason,
}

/// Result of [`normalize_with_report`].
#[derive(Debug, Clone, Default)]
pub struct NormalizeOutcome {
    /// Canonical records sorted by date, then Morning before Evening.
    pub records: Vec<Measurement>,
    /// Every line or stored row that was dropped.
    pub skipped: Vec<SkippedLine>,
}

impl NormalizeOutcome {
    /// `true` when there is nothing to write downstream.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Merge pasted `raw_text` into `existing` and return the canonical set.
///
/// Malformed lines are dropped silently. Use [`normalize_with_report`] to see
/// which ones.
pub fn normalize(raw_text: &str, existing: &[RawRow]) -> Vec<Measurement> {
    normalize_with_report(raw_text, existing).records
}

/// Same as [`normalize`] but also returns the dropped lines.
pub fn normalize_with_report(raw_text: &str, existing: &[RawRow]) -> NormalizeOutcome {
    let mut merged: BTreeMap<RecordKey, Measurement> = BTreeMap::new();
    let mut skipped: Vec<SkippedLine> = Vec::new();

    for (index, row) in existing.iter().enumerate() {
        match convert_existing_row(row) {
            Ok(Some(m)) => {
                merged.insert(m.key(), m);
            }
            Ok(None) => {}
            Err(reason) => {
                debug!("Skipping stored row {}: {}", index, reason);
                skipped.push(SkippedLine {
                    source: LineSource::Existing(index),
                    text: describe_row(row),
                    reason,
                });
            }
        }
    }

    let seeded = merged.len();

    for (index, line) in raw_text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(m) => {
                merged.insert(m.key(), m);
            }
            Err(reason) => {
                debug!("Skipping pasted line {}: {}", index + 1, reason);
                skipped.push(SkippedLine {
                    source: LineSource::Pasted(index + 1),
                    text: line.trim().to_string(),
                    reason,
                });
            }
        }
    }

    debug!(
        "Normalized {} records ({} seeded from store, {} lines skipped)",
        merged.len(),
        seeded,
        skipped.len()
    );

    NormalizeOutcome {
        records: merged.into_values().collect(),
        skipped,
    }
}

/// Parse one pasted line into a [`Measurement`].
pub fn parse_line(line: &str) -> Result<Measurement, SkipReason> {
    let line = strip_leading_noise(line.trim());
    let cells: Vec<&str> = line.split(',').map(str::trim).collect();
    if cells.len() < MIN_FIELDS {
        return Err(SkipReason::FieldCount(cells.len()));
    }

    let (Some(systolic), Some(diastolic)) = (parse_leading_int(cells[2]), parse_leading_int(cells[3]))
    else {
        return Err(SkipReason::InvalidPressure);
    };
    let pulse = cells.get(4).and_then(|c| parse_leading_int(c));

    let date = parse_date(cells[0])?;
    let slot = classify_slot(cells[1])?;

    Ok(Measurement {
        date,
        slot,
        systolic,
        diastolic,
        pulse,
    })
}

/// Convert a previously stored row into the same key space as pasted lines.
///
/// Returns `Ok(None)` for rows whose date cell is blank; those are ignored
/// without being reported.
pub fn convert_existing_row(row: &RawRow) -> Result<Option<Measurement>, SkipReason> {
    use crate::models::CellValue;

    let date_cell = row.cell(0);
    if date_cell.is_blank() {
        return Ok(None);
    }

    let (Some(systolic), Some(diastolic)) = (row.cell(2).as_int(), row.cell(3).as_int()) else {
        return Err(SkipReason::InvalidPressure);
    };
    let pulse = row.cell(4).as_int();

    let date = match date_cell {
        CellValue::Date(d) => *d,
        other => parse_date(&other.as_text().unwrap_or_default())?,
    };
    let slot = classify_slot(&row.cell(1).as_text().unwrap_or_default())?;

    Ok(Some(Measurement {
        date,
        slot,
        systolic,
        diastolic,
        pulse,
    }))
}

// ── Token helpers ─────────────────────────────────────────────────────────────

/// Drop everything before the first run of four digits.
///
/// Lines without such a run are returned unchanged.
pub fn strip_leading_noise(line: &str) -> &str {
    static YEAR_RE: OnceLock<Regex> = OnceLock::new();
    let re = YEAR_RE.get_or_init(|| Regex::new(r"\d{4}").expect("regex is valid"));
    match re.find(line) {
        Some(m) => &line[m.start()..],
        None => line,
    }
}

/// Apply [`DATE_TOKENS`] to a date field.
pub fn normalize_date_token(token: &str) -> String {
    replace_tokens(token, DATE_TOKENS)
}

/// Apply [`TIME_TOKENS`] to a time field.
pub fn normalize_time_token(token: &str) -> String {
    replace_tokens(token, TIME_TOKENS)
}

fn replace_tokens(token: &str, table: &[(&str, &str)]) -> String {
    table
        .iter()
        .fold(token.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// Read an optionally signed integer prefix, ignoring any trailing text.
///
/// `"130mmHg"` gives `130`; `""`, `"x1"` and out-of-range values give `None`.
pub fn parse_leading_int(s: &str) -> Option<i32> {
    let s = s.trim_start();
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1i64, &s[1..]),
        Some(b'+') => (1i64, &s[1..]),
        _ => (1i64, s),
    };
    let digits_end = rest
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    let magnitude: i64 = rest[..digits_end].parse().ok()?;
    i32::try_from(sign * magnitude).ok()
}

/// Parse a date field into a calendar date.
///
/// Accepts `yyyy/mm/dd` after token normalization (so `2024年1月5日` and
/// `2024-01-05` work too) and the compact eight-digit form `20240105`.
pub fn parse_date(token: &str) -> Result<NaiveDate, SkipReason> {
    let normalized = normalize_date_token(strip_leading_noise(token.trim()));
    let invalid = || SkipReason::InvalidDate(token.trim().to_string());

    let (year, month, day) = if normalized.len() == 8 && normalized.bytes().all(|b| b.is_ascii_digit()) {
        let year = normalized[..4].parse::<i32>().map_err(|_| invalid())?;
        let month = normalized[4..6].parse::<i32>().map_err(|_| invalid())?;
        let day = normalized[6..].parse::<i32>().map_err(|_| invalid())?;
        (year, month, day)
    } else {
        let parts: Vec<&str> = normalized.split('/').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }
        let year = parse_leading_int(parts[0]).ok_or_else(invalid)?;
        let month = parse_leading_int(parts[1]).ok_or_else(invalid)?;
        let day = parse_leading_int(parts[2]).ok_or_else(invalid)?;
        (year, month, day)
    };

    let (Ok(month), Ok(day)) = (u32::try_from(month), u32::try_from(day)) else {
        return Err(invalid());
    };
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Classify a time field into a slot.
///
/// A literal marker wins. Otherwise an `HH:MM`-shaped value is bucketed by
/// hour: 4-11 is Morning, 18-23 and 0-3 are Evening, 12-17 is rejected.
pub fn classify_slot(token: &str) -> Result<Slot, SkipReason> {
    let lowered = token.trim().to_lowercase();
    if let Some((_, slot)) = SLOT_MARKERS.iter().find(|(marker, _)| lowered.contains(marker)) {
        return Ok(*slot);
    }

    let normalized = normalize_time_token(&lowered);
    let Some((hour_part, _)) = normalized.split_once(':') else {
        return Err(SkipReason::UnrecognisedTime(token.trim().to_string()));
    };
    let hour = parse_leading_int(hour_part)
        .ok_or_else(|| SkipReason::UnrecognisedTime(token.trim().to_string()))?;

    match hour {
        4..=11 => Ok(Slot::Morning),
        18..=23 | 0..=3 => Ok(Slot::Evening),
        _ => Err(SkipReason::AmbiguousHour(hour)),
    }
}

fn describe_row(row: &RawRow) -> String {
    row.0
        .iter()
        .map(|c| c.as_text().unwrap_or_default())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn stored(date: &str, slot: &str, sys: f64, dia: f64, pulse: Option<f64>) -> RawRow {
        RawRow(vec![
            CellValue::Text(date.to_string()),
            CellValue::Text(slot.to_string()),
            CellValue::Number(sys),
            CellValue::Number(dia),
            pulse.map(CellValue::Number).unwrap_or(CellValue::Empty),
        ])
    }

    // ── token helpers ─────────────────────────────────────────────────────────

    #[test]
    fn test_strip_leading_noise() {
        assert_eq!(strip_leading_noise("◆ 2024/01/05,朝,120,80"), "2024/01/05,朝,120,80");
        assert_eq!(strip_leading_noise("no year here"), "no year here");
    }

    #[test]
    fn test_normalize_date_token_full_width_markers() {
        assert_eq!(normalize_date_token("2024年1月5日"), "2024/1/5");
        assert_eq!(normalize_date_token("2024-01-05"), "2024/01/05");
    }

    #[test]
    fn test_normalize_time_token() {
        assert_eq!(normalize_time_token("7時30分"), "7:30");
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int("130"), Some(130));
        assert_eq!(parse_leading_int("130mmHg"), Some(130));
        assert_eq!(parse_leading_int("-4"), Some(-4));
        assert_eq!(parse_leading_int("xx"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("99999999999"), None);
    }

    #[test]
    fn test_parse_date_variants() {
        assert_eq!(parse_date("2024/01/05"), Ok(date(2024, 1, 5)));
        assert_eq!(parse_date("2024年1月5日"), Ok(date(2024, 1, 5)));
        assert_eq!(parse_date("20240105"), Ok(date(2024, 1, 5)));
    }

    #[test]
    fn test_parse_date_rejects_invalid_calendar_date() {
        assert!(matches!(parse_date("2024/02/30"), Err(SkipReason::InvalidDate(_))));
        assert!(matches!(parse_date("2024/13/01"), Err(SkipReason::InvalidDate(_))));
    }

    #[test]
    fn test_parse_date_rejects_wrong_part_count() {
        assert!(matches!(parse_date("2024/01"), Err(SkipReason::InvalidDate(_))));
        assert!(matches!(parse_date("abcd"), Err(SkipReason::InvalidDate(_))));
    }

    // ── slot classification ───────────────────────────────────────────────────

    #[test]
    fn test_classify_slot_by_hour() {
        assert_eq!(classify_slot("07:30"), Ok(Slot::Morning));
        assert_eq!(classify_slot("20:15"), Ok(Slot::Evening));
        assert_eq!(classify_slot("02:00"), Ok(Slot::Evening));
        assert_eq!(classify_slot("04:00"), Ok(Slot::Morning));
        assert_eq!(classify_slot("11:59"), Ok(Slot::Morning));
        assert_eq!(classify_slot("18:00"), Ok(Slot::Evening));
    }

    #[test]
    fn test_classify_slot_afternoon_is_discarded() {
        assert_eq!(classify_slot("14:00"), Err(SkipReason::AmbiguousHour(14)));
        assert_eq!(classify_slot("12:00"), Err(SkipReason::AmbiguousHour(12)));
    }

    #[test]
    fn test_classify_slot_out_of_range_hour_is_discarded() {
        assert_eq!(classify_slot("25:00"), Err(SkipReason::AmbiguousHour(25)));
    }

    #[test]
    fn test_classify_slot_markers() {
        assert_eq!(classify_slot("朝"), Ok(Slot::Morning));
        assert_eq!(classify_slot("夜"), Ok(Slot::Evening));
        assert_eq!(classify_slot("Evening"), Ok(Slot::Evening));
        // Morning marker is checked first.
        assert_eq!(classify_slot("朝夜"), Ok(Slot::Morning));
    }

    #[test]
    fn test_classify_slot_japanese_time() {
        assert_eq!(classify_slot("21時05分"), Ok(Slot::Evening));
        assert_eq!(classify_slot("6時"), Ok(Slot::Morning));
    }

    #[test]
    fn test_classify_slot_other_shapes_discarded() {
        assert!(matches!(classify_slot("noon"), Err(SkipReason::UnrecognisedTime(_))));
        assert!(matches!(classify_slot(""), Err(SkipReason::UnrecognisedTime(_))));
    }

    // ── parse_line ────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_line_full() {
        let m = parse_line("2024/03/01, 07:10, 128, 84, 66").unwrap();
        assert_eq!(m.date, date(2024, 3, 1));
        assert_eq!(m.slot, Slot::Morning);
        assert_eq!((m.systolic, m.diastolic, m.pulse), (128, 84, Some(66)));
    }

    #[test]
    fn test_parse_line_without_pulse() {
        let m = parse_line("2024/03/01,夜,128,84").unwrap();
        assert_eq!(m.pulse, None);
        let m = parse_line("2024/03/01,夜,128,84,--").unwrap();
        assert_eq!(m.pulse, None);
    }

    #[test]
    fn test_parse_line_with_leading_noise() {
        let m = parse_line("測定: 2024年3月1日,21時00分,135,88,70").unwrap();
        assert_eq!(m.date, date(2024, 3, 1));
        assert_eq!(m.slot, Slot::Evening);
    }

    #[test]
    fn test_parse_line_non_numeric_pressures_discarded() {
        assert_eq!(parse_line("abcd,xx,yy,zz"), Err(SkipReason::InvalidPressure));
    }

    #[test]
    fn test_parse_line_too_few_fields() {
        assert_eq!(parse_line("2024/03/01,朝,120"), Err(SkipReason::FieldCount(3)));
    }

    // ── normalize ─────────────────────────────────────────────────────────────

    #[test]
    fn test_normalize_empty_input() {
        let outcome = normalize_with_report("", &[]);
        assert!(outcome.is_empty());
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_normalize_all_invalid_input_is_empty() {
        let outcome = normalize_with_report("abcd,xx,yy,zz\nhello\n", &[]);
        assert!(outcome.is_empty());
        assert_eq!(outcome.skipped.len(), 2);
        assert_eq!(outcome.skipped[0].source, LineSource::Pasted(1));
    }

    #[test]
    fn test_normalize_discards_malformed_line_only() {
        let raw = "2024/01/01,朝,120,80\nabcd,xx,yy,zz\n2024/01/01,夜,125,82";
        let outcome = normalize_with_report(raw, &[]);
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].source, LineSource::Pasted(2));
        assert_eq!(outcome.skipped[0].reason, SkipReason::InvalidPressure);
    }

    #[test]
    fn test_normalize_new_overwrites_existing() {
        let existing = vec![stored("2024/01/01", "朝", 120.0, 80.0, Some(70.0))];
        let records = normalize("20240101,朝,130,85", &existing);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].systolic, 130);
        assert_eq!(records[0].diastolic, 85);
        // Whole-record overwrite: the old pulse is not carried over.
        assert_eq!(records[0].pulse, None);
    }

    #[test]
    fn test_normalize_later_duplicate_in_paste_wins() {
        let raw = "2024/01/01,07:00,120,80,60\n2024/01/01,08:30,140,90,75";
        let records = normalize(raw, &[]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].systolic, 140);
        assert_eq!(records[0].pulse, Some(75));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = "2024/01/02,夜,118,77,64\n2024/01/01,朝,120,80\n2024/01/01,20:00,126,81,70";
        let first = normalize(raw, &[]);
        let stored_rows: Vec<RawRow> = first.iter().map(Measurement::to_raw_row).collect();
        let second = normalize(raw, &stored_rows);
        assert_eq!(first, second);
    }

    #[test]
    fn test_normalize_keys_are_unique_and_sorted() {
        let raw = "2024/01/02,朝,1,1\n2024/01/01,夜,2,2\n2024/01/01,朝,3,3\n2024/01/02,朝,4,4";
        let records = normalize(raw, &[]);
        let keys: Vec<RecordKey> = records.iter().map(Measurement::key).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(keys, sorted);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].slot, Slot::Morning);
        assert_eq!(records[1].slot, Slot::Evening);
    }

    #[test]
    fn test_normalize_existing_structured_date() {
        let existing = vec![RawRow(vec![
            CellValue::Date(date(2023, 12, 31)),
            CellValue::Text("夜".to_string()),
            CellValue::Number(130.0),
            CellValue::Number(85.0),
            CellValue::Number(72.0),
        ])];
        let records = normalize("", &existing);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, date(2023, 12, 31));
        assert_eq!(records[0].pulse, Some(72));
    }

    #[test]
    fn test_normalize_existing_blank_row_ignored_silently() {
        let existing = vec![RawRow(vec![CellValue::Empty, CellValue::Text("朝".to_string())])];
        let outcome = normalize_with_report("", &existing);
        assert!(outcome.records.is_empty());
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_normalize_existing_bad_row_reported() {
        let existing = vec![stored("2024/01/01", "昼", 120.0, 80.0, None)];
        let outcome = normalize_with_report("", &existing);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.skipped[0].source, LineSource::Existing(0));
    }

    #[test]
    fn test_normalize_handles_crlf() {
        let records = normalize("2024/01/01,朝,120,80\r\n2024/01/02,朝,121,81\r\n", &[]);
        assert_eq!(records.len(), 2);
    }
}
