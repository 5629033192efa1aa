mod bootstrap;

use std::process::ExitCode;

use anyhow::Result;
use ledger_core::error::LedgerError;
use ledger_core::settings::Settings;
use ledger_core::time_utils::{resolve_timezone, SystemClock};
use ledger_data::pipeline::{process_input, PipelineOptions, ProcessOutcome};
use ledger_data::store::{DirectoryViews, JsonLedgerStore};
use ledger_report::summary::{render_completed, render_nothing_to_process};

fn main() -> Result<ExitCode> {
    let settings = Settings::load_with_last_used();
    let data_dir = settings.validate_data_dir()?;

    bootstrap::ensure_directories(&data_dir)?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;

    tracing::info!("bp-ledger v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Data directory: {}", data_dir.display());

    let owner = settings.owner().ok_or(LedgerError::MissingUserName)?;
    let windows = settings.window_specs()?;
    let timezone = resolve_timezone(&settings.timezone);
    tracing::info!(
        "Owner: {}, timezone: {}, windows: {}",
        owner,
        timezone.name(),
        settings.windows
    );

    let raw_text = bootstrap::read_input(settings.input.as_deref())?;

    let mut store = JsonLedgerStore::in_dir(&data_dir);
    let mut views = DirectoryViews::new(data_dir.join("views"));
    let clock = SystemClock;
    let options = PipelineOptions {
        windows,
        timezone,
        clock: &clock,
    };

    match process_input(&raw_text, owner, &mut store, &mut views, &options)? {
        ProcessOutcome::Completed(summary) => {
            print!(
                "{}",
                render_completed(&summary, owner, timezone.name(), settings.show_skipped)
            );
            Ok(ExitCode::SUCCESS)
        }
        ProcessOutcome::NothingToProcess { skipped } => {
            eprint!("{}", render_nothing_to_process(&skipped, settings.show_skipped));
            Ok(ExitCode::FAILURE)
        }
    }
}
