use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_FILTER_ENV: &str = "CHATLOGS_LOG";
pub const LOG_FILE_NAME: &str = "chatlogs.log";

#[derive(Debug, Error)]
pub enum InitLoggingError {
    #[error("failed to create log directory: {0}")]
    CreateDir(#[from] io::Error),

    #[error("invalid CHATLOGS_LOG filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to install log subscriber: {0}")]
    Install(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Routes `tracing` output to `<state_dir>/chatlogs.log`; the terminal belongs to the UI.
/// Keep the returned guard alive until exit so buffered lines are flushed.
pub fn init_file_logging(state_dir: &Path) -> Result<WorkerGuard, InitLoggingError> {
    fs::create_dir_all(state_dir)?;

    let filter = match std::env::var(LOG_FILTER_ENV) {
        Ok(raw) if !raw.trim().is_empty() => EnvFilter::try_new(raw)?,
        _ => EnvFilter::new("info"),
    };

    let appender = tracing_appender::rolling::never(state_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(guard)
}
