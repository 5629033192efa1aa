use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::WindowSpec;

/// Name of the per-user directory under `$HOME`.
pub const APP_DIR_NAME: &str = ".bp-ledger";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Merge pasted blood-pressure readings into a running ledger
#[derive(Parser, Debug, Clone)]
#[command(
    name = "bp-ledger",
    about = "Merge pasted blood-pressure readings into a running ledger",
    version
)]
pub struct Settings {
    /// File holding the pasted readings ("-" or absent reads stdin)
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,

    /// Directory holding the ledger and its views
    #[arg(long, env = "BP_LEDGER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Owner name written into ledger and chart titles
    #[arg(long)]
    pub user_name: Option<String>,

    /// Timezone used for every date in the run (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Comma-separated reporting windows in days
    #[arg(long, default_value = "30,90,180,365", value_parser = parse_windows_arg)]
    pub windows: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// List every skipped line with the reason it was dropped
    #[arg(long)]
    pub show_skipped: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.bp-ledger/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows: Option<String>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(APP_DIR_NAME).join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, resolve `"auto"` values, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation; accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::resolve_auto_values(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins over the persisted value.
        if settings.user_name.is_none() {
            settings.user_name = last.user_name;
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = last.timezone {
                settings.timezone = v;
            }
        }
        // A data dir from the environment is used but never persisted.
        let persisted_data_dir = last.data_dir.clone();
        if settings.data_dir.is_none() {
            settings.data_dir = last.data_dir;
        }
        if !is_arg_explicitly_set(&matches, "windows") {
            // A saved list that no longer parses is dropped for the default.
            if let Some(v) = last.windows.filter(|w| WindowSpec::parse_list(w).is_ok()) {
                settings.windows = v;
            }
        }

        settings = Self::resolve_auto_values(settings);

        let mut params = LastUsedParams::from(&settings);
        if !is_arg_explicitly_set(&matches, "data_dir") {
            params.data_dir = persisted_data_dir;
        }
        let _ = params.save_to(config_path);

        settings
    }

    /// Resolve the `"auto"` timezone and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone == "auto" {
            settings.timezone = crate::time_utils::get_system_timezone();
        }
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Parsed reporting windows.
    pub fn window_specs(&self) -> crate::error::Result<Vec<WindowSpec>> {
        WindowSpec::parse_list(&self.windows)
    }

    /// Directory holding the ledger, defaulting to `~/.bp-ledger`.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR_NAME)
        })
    }

    /// Reject a data directory path that points at something other than a
    /// directory.
    pub fn validate_data_dir(&self) -> crate::error::Result<PathBuf> {
        let dir = self.resolved_data_dir();
        if dir.exists() && !dir.is_dir() {
            return Err(crate::error::LedgerError::Config(format!(
                "data dir {} is not a directory",
                dir.display()
            )));
        }
        Ok(dir)
    }

    /// Owner name with surrounding whitespace removed, if one is set.
    pub fn owner(&self) -> Option<&str> {
        self.user_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            user_name: s.user_name.clone(),
            timezone: Some(s.timezone.clone()),
            data_dir: s.data_dir.clone(),
            windows: Some(s.windows.clone()),
        }
    }
}

/// Clap value parser for `--windows`: the list must parse as window specs.
fn parse_windows_arg(value: &str) -> Result<String, String> {
    WindowSpec::parse_list(value)
        .map(|_| value.to_string())
        .map_err(|e| e.to_string())
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
