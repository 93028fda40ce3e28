pub mod env;
pub mod types;

use anyhow::{Context, Result};
use std::path::Path;
use types::{AppConfig, OverflowPolicy};

/// Maximum config file size (1 MB)
const MAX_CONFIG_SIZE: u64 = 1_048_576;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_PATH: &str = "uniqd.toml";

/// Load and validate configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let metadata = std::fs::metadata(path)
        .with_context(|| format!("reading config metadata: {}", path.display()))?;
    if metadata.len() > MAX_CONFIG_SIZE {
        anyhow::bail!(
            "config file too large: {} bytes (max {} bytes)",
            metadata.len(),
            MAX_CONFIG_SIZE
        );
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config: {}", path.display()))?;
    parse_config(&content)
}

/// Resolve the effective configuration with `UNIQD_*` environment overrides
/// on top.
///
/// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_PATH`] is
/// used when present and built-in defaults otherwise.
pub fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                load_config(default_path)?
            } else {
                AppConfig::default()
            }
        }
    };
    env::apply_env_overrides(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(content).context("parsing TOML configuration")?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    validate_server(config)?;
    validate_window(config)?;
    validate_ingest(config)?;
    validate_notifier(config)?;
    validate_metrics(config)?;
    Ok(())
}

fn validate_server(config: &AppConfig) -> Result<()> {
    if config.server.listen.trim().is_empty() {
        anyhow::bail!("server.listen must not be empty");
    }
    Ok(())
}

fn validate_window(config: &AppConfig) -> Result<()> {
    if config.window.interval_secs == 0 {
        anyhow::bail!("window.interval_secs must be greater than 0");
    }
    if config.window.log_path.as_os_str().is_empty() {
        anyhow::bail!("window.log_path must not be empty");
    }
    Ok(())
}

fn validate_ingest(config: &AppConfig) -> Result<()> {
    if config.ingest.capacity == 0 {
        anyhow::bail!("ingest.capacity must be greater than 0");
    }
    if config.ingest.overflow == OverflowPolicy::Timeout && config.ingest.enqueue_timeout_ms == 0
    {
        anyhow::bail!(
            "ingest.enqueue_timeout_ms must be greater than 0 when overflow = \"timeout\" \
             (use overflow = \"reject\" to fail immediately)"
        );
    }
    Ok(())
}

fn validate_notifier(config: &AppConfig) -> Result<()> {
    if config.notifier.max_concurrent == 0 {
        anyhow::bail!("notifier.max_concurrent must be greater than 0");
    }
    if config.notifier.timeout_ms == 0 {
        anyhow::bail!("notifier.timeout_ms must be greater than 0");
    }
    Ok(())
}

fn validate_metrics(config: &AppConfig) -> Result<()> {
    if config.metrics.enabled && config.metrics.listen.trim().is_empty() {
        anyhow::bail!("metrics.listen must not be empty when metrics are enabled");
    }
    Ok(())
}
