use std::fs::OpenOptions;
use std::io::Read;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure the data directory hierarchy exists.
///
/// Creates the following directories if absent (including any missing parents):
/// - `<data_dir>/`
/// - `<data_dir>/logs/`
/// - `<data_dir>/views/`
pub fn ensure_directories(data_dir: &Path) -> anyhow::Result<()> {
    for dir in [data_dir.to_path_buf(), data_dir.join("logs"), data_dir.join("views")] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a user-facing level name to an [`EnvFilter`] directive.
///
/// Accepts the `DEBUG/INFO/WARNING/ERROR/CRITICAL` names in any case; other
/// strings pass through unchanged so full directives still work.
pub fn level_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Logs go to stderr, or appended to `log_file` without ANSI colours when one
/// is given. An unparseable level falls back to `"info"`.
pub fn setup_logging(log_level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(level_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()?;
        }
        None => {
            registry
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .try_init()?;
        }
    }

    Ok(())
}

// ── Input ──────────────────────────────────────────────────────────────────────

/// Read the pasted text from `input`, or from stdin when it is `None` or `-`.
pub fn read_input(input: Option<&Path>) -> anyhow::Result<String> {
    match input {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input {}", path.display())),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read input from stdin")?;
            Ok(buf)
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
