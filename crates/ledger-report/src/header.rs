/// Decoration placed either side of the report title.
pub const SPARKLES: &str = "✦ ✧ ✦ ✧";

/// Report header rendering four lines:
///
/// 1. Ledger title with sparkle decorations.
/// 2. A 60-column `=` separator.
/// 3. Owner and timezone in `[ owner | timezone ]` format.
/// 4. An empty line.
pub struct Header<'a> {
    /// Ledger owner's display name.
    pub owner: &'a str,
    /// Timezone name the windows were measured in.
    pub timezone: &'a str,
}

impl<'a> Header<'a> {
    pub fn new(owner: &'a str, timezone: &'a str) -> Self {
        Self { owner, timezone }
    }

    pub fn to_lines(&self) -> Vec<String> {
        vec![
            format!("{SPARKLES} BLOOD PRESSURE LEDGER {SPARKLES}"),
            "=".repeat(60),
            format!("[ {} | {} ]", self.owner, self.timezone),
            String::new(),
        ]
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_to_lines_count() {
        let lines = Header::new("山田", "UTC").to_lines();
        assert_eq!(lines.len(), 4, "header must produce exactly 4 lines");
        assert!(lines[3].is_empty());
    }

    #[test]
    fn test_header_title_line_content() {
        let lines = Header::new("山田", "UTC").to_lines();
        assert!(lines[0].contains("BLOOD PRESSURE LEDGER"));
        assert!(lines[0].starts_with(SPARKLES));
    }

    #[test]
    fn test_header_separator_line() {
        let lines = Header::new("山田", "Asia/Tokyo").to_lines();
        assert_eq!(lines[1].chars().count(), 60);
        assert!(lines[1].chars().all(|c| c == '='));
    }

    #[test]
    fn test_header_info_line() {
        let lines = Header::new("山田", "Asia/Tokyo").to_lines();
        assert_eq!(lines[2], "[ 山田 | Asia/Tokyo ]");
    }
}
