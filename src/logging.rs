use std::io::IsTerminal;

use tracing_subscriber::EnvFilter;

use crate::config::types::LogFormat;

/// Build the filter for `level`, falling back to `info` when the directive
/// does not parse.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the global tracing subscriber.
///
/// Pretty output uses ANSI colors only when stdout is a terminal.
pub fn setup_logging(level: &str, format: LogFormat) {
    let filter = build_filter(level);

    match format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt()
                .with_ansi(std::io::stdout().is_terminal())
                .with_env_filter(filter)
                .init();
        }
    }
}
