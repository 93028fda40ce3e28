//! Environment variable overrides.
//!
//! Applied on top of the config file (or the built-in defaults when no file
//! exists), so a container can run without mounting any configuration.

use crate::config::types::*;
use std::path::PathBuf;

/// Overlay `UNIQD_*` environment variables onto `config`.
///
/// Unparseable numeric values keep the current setting; unknown enum values
/// are rejected so a typo in a policy name cannot silently change behavior.
pub fn apply_env_overrides(config: &mut AppConfig) -> anyhow::Result<()> {
    if let Some(v) = opt_env("UNIQD_LISTEN") {
        config.server.listen = v;
    }
    config.server.shutdown_timeout =
        parse_env("UNIQD_SHUTDOWN_TIMEOUT", config.server.shutdown_timeout);

    config.window.interval_secs = parse_env("UNIQD_WINDOW_SECS", config.window.interval_secs);
    if let Some(v) = opt_env("UNIQD_LOG_PATH") {
        config.window.log_path = PathBuf::from(v);
    }

    config.ingest.capacity = parse_env("UNIQD_QUEUE_CAPACITY", config.ingest.capacity);
    if let Some(v) = opt_env("UNIQD_QUEUE_OVERFLOW") {
        config.ingest.overflow = parse_overflow_policy(&v)?;
    }
    config.ingest.enqueue_timeout_ms =
        parse_env("UNIQD_ENQUEUE_TIMEOUT_MS", config.ingest.enqueue_timeout_ms);

    if let Some(v) = opt_env("UNIQD_LOG_LEVEL") {
        config.logging.level = parse_log_level(&v)?;
    }
    if let Some(v) = opt_env("UNIQD_LOG_FORMAT") {
        config.logging.format = parse_log_format(&v)?;
    }

    if let Some(v) = opt_env("UNIQD_METRICS_LISTEN") {
        config.metrics.enabled = true;
        config.metrics.listen = v;
    }

    Ok(())
}

pub fn parse_overflow_policy(s: &str) -> anyhow::Result<OverflowPolicy> {
    match s.to_ascii_lowercase().as_str() {
        "block" => Ok(OverflowPolicy::Block),
        "reject" => Ok(OverflowPolicy::Reject),
        "timeout" => Ok(OverflowPolicy::Timeout),
        _ => anyhow::bail!("invalid overflow policy '{s}' (available: block, reject, timeout)"),
    }
}

pub fn parse_log_level(s: &str) -> anyhow::Result<LogLevel> {
    match s.to_ascii_lowercase().as_str() {
        "trace" => Ok(LogLevel::Trace),
        "debug" => Ok(LogLevel::Debug),
        "info" => Ok(LogLevel::Info),
        "warn" => Ok(LogLevel::Warn),
        "error" => Ok(LogLevel::Error),
        _ => anyhow::bail!("invalid log level '{s}'"),
    }
}

pub fn parse_log_format(s: &str) -> anyhow::Result<LogFormat> {
    match s.to_ascii_lowercase().as_str() {
        "pretty" => Ok(LogFormat::Pretty),
        "json" => Ok(LogFormat::Json),
        _ => anyhow::bail!("invalid log format '{s}' (available: pretty, json)"),
    }
}

fn opt_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    opt_env(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}
