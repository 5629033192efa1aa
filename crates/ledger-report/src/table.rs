//! Column-aligned plain-text tables.
//!
//! Widths are measured in terminal columns with [`unicode_width`], so CJK
//! headers such as `最高血圧` line up with ASCII digits.

use unicode_width::UnicodeWidthStr;

use ledger_core::models::ReadingRow;

/// Horizontal alignment of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// A header row plus data rows, rendered with a `-` rule under the header.
#[derive(Debug, Clone, Default)]
pub struct TextTable {
    headers: Vec<String>,
    aligns: Vec<Align>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    /// Left-aligned first column, right-aligned rest.
    pub fn new<S: AsRef<str>>(headers: &[S]) -> Self {
        let aligns = (0..headers.len())
            .map(|i| if i == 0 { Align::Left } else { Align::Right })
            .collect();
        Self {
            headers: headers.iter().map(|h| h.as_ref().to_string()).collect(),
            aligns,
            rows: Vec::new(),
        }
    }

    /// Table of readings with the view headers (date, systolic, diastolic, pulse).
    pub fn for_readings(rows: &[ReadingRow]) -> Self {
        let mut table = Self::new(&ledger_core::models::VIEW_HEADERS);
        for row in rows {
            table.push_row(vec![
                row.date_key(),
                row.systolic.to_string(),
                row.diastolic.to_string(),
                row.pulse.map(|p| p.to_string()).unwrap_or_default(),
            ]);
        }
        table
    }

    /// Append a row; missing cells render blank and extra cells are dropped.
    pub fn push_row(&mut self, mut cells: Vec<String>) {
        cells.resize(self.headers.len(), String::new());
        self.rows.push(cells);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.width()).collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.width());
            }
        }
        widths
    }

    /// Render as lines without trailing whitespace.
    pub fn to_lines(&self) -> Vec<String> {
        let widths = self.column_widths();
        let mut lines = Vec::with_capacity(self.rows.len() + 2);

        lines.push(self.format_row(&self.headers, &widths));
        let rule_width = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        lines.push("-".repeat(rule_width));
        for row in &self.rows {
            lines.push(self.format_row(row, &widths));
        }
        lines
    }

    fn format_row(&self, cells: &[String], widths: &[usize]) -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .zip(&self.aligns)
            .map(|((cell, &width), align)| pad(cell, width, *align))
            .collect();
        padded.join("  ").trim_end().to_string()
    }
}

/// Pad `text` to `width` terminal columns.
pub fn pad(text: &str, width: usize, align: Align) -> String {
    let fill = " ".repeat(width.saturating_sub(text.width()));
    match align {
        Align::Left => format!("{text}{fill}"),
        Align::Right => format!("{fill}{text}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_pad_counts_wide_characters() {
        assert_eq!(pad("朝", 4, Align::Left), "朝  ");
        assert_eq!(pad("12", 4, Align::Right), "  12");
        assert_eq!(pad("toolong", 3, Align::Left), "toolong");
    }

    #[test]
    fn test_table_aligns_columns() {
        let mut table = TextTable::new(&["name", "value"]);
        table.push_row(vec!["a".to_string(), "1".to_string()]);
        table.push_row(vec!["bbb".to_string(), "100".to_string()]);

        let lines = table.to_lines();
        assert_eq!(lines[0], "name  value");
        assert_eq!(lines[1], "-----------");
        assert_eq!(lines[2], "a         1");
        assert_eq!(lines[3], "bbb     100");
    }

    #[test]
    fn test_table_short_rows_are_padded() {
        let mut table = TextTable::new(&["a", "b", "c"]);
        table.push_row(vec!["x".to_string()]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.to_lines()[2], "x");
    }

    #[test]
    fn test_for_readings_blank_pulse() {
        let rows = vec![ReadingRow {
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            systolic: 120,
            diastolic: 80,
            pulse: None,
        }];
        let lines = TextTable::for_readings(&rows).to_lines();
        assert!(lines[0].starts_with("日付"));
        assert_eq!(lines[0].width(), 36);
        assert_eq!(lines[2], "2024/01/05       120        80");
    }

    #[test]
    fn test_empty_table_renders_header_only() {
        let table = TextTable::new(&["a"]);
        assert!(table.is_empty());
        assert_eq!(table.to_lines().len(), 2);
    }
}
