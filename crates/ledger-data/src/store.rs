//! Persistence boundary for the ledger and its derived views.
//!
//! The pipeline only talks to [`LedgerStore`] and [`ViewSink`]. Every write is
//! a whole-table overwrite; nothing is patched in place.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ledger_core::error::{LedgerError, Result};
use ledger_core::models::{
    ledger_title, CellValue, Measurement, RawRow, ReadingRow, LEDGER_HEADERS, VIEW_HEADERS,
};

use crate::aggregator::{Averages, MonthlySplit, WindowReport};

// ── Traits ────────────────────────────────────────────────────────────────────

/// The canonical ledger: read as raw rows, written as sorted measurements.
pub trait LedgerStore {
    /// Every stored data row, in stored order. A ledger that does not exist
    /// yet reads as empty.
    fn read_rows(&self) -> Result<Vec<RawRow>>;

    /// Replace the whole ledger with `records`.
    fn write_records(&mut self, owner: &str, records: &[Measurement]) -> Result<()>;
}

/// Destination of the monthly and window views.
pub trait ViewSink {
    /// Drop every existing monthly view and write one per bucket.
    ///
    /// Returns the display names written, in bucket order.
    fn replace_monthly_views(&mut self, split: &MonthlySplit) -> Result<Vec<String>>;

    /// Drop every existing window view and write one per report.
    fn replace_window_views(
        &mut self,
        owner: &str,
        reports: &[WindowReport],
        created_on: &str,
    ) -> Result<()>;
}

// ── Documents ─────────────────────────────────────────────────────────────────

/// On-disk shape of the ledger table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerDocument {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub headers: Vec<String>,
    #[serde(default)]
    pub rows: Vec<RawRow>,
}

/// On-disk shape of one monthly view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyViewDocument {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// On-disk shape of one window view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowViewDocument {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub averages: Option<AveragesDocument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AveragesDocument {
    pub systolic: i32,
    pub diastolic: i32,
    pub pulse: i32,
}

impl From<Averages> for AveragesDocument {
    fn from(a: Averages) -> Self {
        Self {
            systolic: a.systolic,
            diastolic: a.diastolic,
            pulse: a.pulse,
        }
    }
}

fn view_row(row: &ReadingRow) -> RawRow {
    RawRow(vec![
        CellValue::Text(row.date_key()),
        CellValue::Number(f64::from(row.systolic)),
        CellValue::Number(f64::from(row.diastolic)),
        row.pulse
            .map(|p| CellValue::Number(f64::from(p)))
            .unwrap_or(CellValue::Empty),
    ])
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|h| h.to_string()).collect()
}

impl WindowViewDocument {
    fn from_report(owner: &str, report: &WindowReport, created_on: &str) -> Self {
        let message = report.empty_message();
        let ready = message.is_none();
        Self {
            name: report.view_name(),
            headers: headers(&VIEW_HEADERS),
            rows: report.rows.iter().map(view_row).collect(),
            averages: ready.then(|| report.averages.into()),
            chart_title: ready.then(|| report.chart_title(owner, created_on)),
            message,
        }
    }
}

// ── File helpers ──────────────────────────────────────────────────────────────

/// Serialize `value` as pretty JSON and replace `path` atomically.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let write_err = |source: std::io::Error| LedgerError::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let json = serde_json::to_string_pretty(value)?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(write_err)?;
    std::fs::rename(&tmp, path).map_err(write_err)?;
    Ok(())
}

/// Remove every file in `dir` whose name matches `pattern`.
fn remove_matching(dir: &Path, pattern: &Regex) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let entries = std::fs::read_dir(dir).map_err(|source| LedgerError::FileRead {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        if pattern.is_match(&name.to_string_lossy()) {
            let path = entry.path();
            std::fs::remove_file(&path)
                .map_err(|source| LedgerError::FileWrite { path, source })?;
            removed += 1;
        }
    }
    Ok(removed)
}

fn monthly_view_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-(morning|evening)\.json$").expect("regex is valid"))
}

fn window_view_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+d-(morning|evening)\.json$").expect("regex is valid"))
}

// ── JsonLedgerStore ───────────────────────────────────────────────────────────

/// Ledger kept as a single JSON table document.
#[derive(Debug, Clone)]
pub struct JsonLedgerStore {
    path: PathBuf,
}

impl JsonLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ledger file inside `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("ledger.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the whole document; a missing file is an empty ledger.
    pub fn load_document(&self) -> Result<LedgerDocument> {
        if !self.path.exists() {
            debug!("Ledger {} does not exist yet", self.path.display());
            return Ok(LedgerDocument::default());
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|source| LedgerError::FileRead {
                path: self.path.clone(),
                source,
            })?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl LedgerStore for JsonLedgerStore {
    fn read_rows(&self) -> Result<Vec<RawRow>> {
        Ok(self.load_document()?.rows)
    }

    fn write_records(&mut self, owner: &str, records: &[Measurement]) -> Result<()> {
        let doc = LedgerDocument {
            title: ledger_title(owner),
            headers: headers(&LEDGER_HEADERS),
            rows: records.iter().map(Measurement::to_raw_row).collect(),
        };
        write_json_atomic(&self.path, &doc)?;
        debug!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}

// ── DirectoryViews ────────────────────────────────────────────────────────────

/// Views written as one JSON file each under `monthly/` and `windows/`.
#[derive(Debug, Clone)]
pub struct DirectoryViews {
    root: PathBuf,
}

impl DirectoryViews {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn monthly_dir(&self) -> PathBuf {
        self.root.join("monthly")
    }

    pub fn windows_dir(&self) -> PathBuf {
        self.root.join("windows")
    }
}

impl ViewSink for DirectoryViews {
    fn replace_monthly_views(&mut self, split: &MonthlySplit) -> Result<Vec<String>> {
        let dir = self.monthly_dir();
        let removed = remove_matching(&dir, monthly_view_pattern())?;
        debug!("Removed {} stale monthly views", removed);

        let mut names = Vec::with_capacity(split.buckets.len());
        for (key, rows) in &split.buckets {
            let doc = MonthlyViewDocument {
                name: key.view_name(),
                headers: headers(&VIEW_HEADERS),
                rows: rows.iter().map(view_row).collect(),
            };
            write_json_atomic(&dir.join(format!("{}.json", key.file_stem())), &doc)?;
            names.push(doc.name);
        }
        Ok(names)
    }

    fn replace_window_views(
        &mut self,
        owner: &str,
        reports: &[WindowReport],
        created_on: &str,
    ) -> Result<()> {
        let dir = self.windows_dir();
        remove_matching(&dir, window_view_pattern())?;

        for report in reports {
            let doc = WindowViewDocument::from_report(owner, report, created_on);
            write_json_atomic(&dir.join(format!("{}.json", report.file_stem())), &doc)?;
        }
        debug!("Wrote {} window views to {}", reports.len(), dir.display());
        Ok(())
    }
}

// ── InMemoryLedger ────────────────────────────────────────────────────────────

/// Ledger and views held in memory; used by tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    pub title: String,
    pub rows: Vec<RawRow>,
    pub monthly: BTreeMap<String, Vec<ReadingRow>>,
    pub windows: Vec<WindowViewDocument>,
    /// Number of whole-ledger writes performed.
    pub ledger_writes: usize,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger pre-populated with `rows`.
    pub fn with_rows(rows: Vec<RawRow>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }
}

impl LedgerStore for InMemoryLedger {
    fn read_rows(&self) -> Result<Vec<RawRow>> {
        Ok(self.rows.clone())
    }

    fn write_records(&mut self, owner: &str, records: &[Measurement]) -> Result<()> {
        self.title = ledger_title(owner);
        self.rows = records.iter().map(Measurement::to_raw_row).collect();
        self.ledger_writes += 1;
        Ok(())
    }
}

impl ViewSink for InMemoryLedger {
    fn replace_monthly_views(&mut self, split: &MonthlySplit) -> Result<Vec<String>> {
        self.monthly = split
            .buckets
            .iter()
            .map(|(key, rows)| (key.view_name(), rows.clone()))
            .collect();
        Ok(split.buckets.keys().map(|key| key.view_name()).collect())
    }

    fn replace_window_views(
        &mut self,
        owner: &str,
        reports: &[WindowReport],
        created_on: &str,
    ) -> Result<()> {
        self.windows = reports
            .iter()
            .map(|r| WindowViewDocument::from_report(owner, r, created_on))
            .collect();
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
