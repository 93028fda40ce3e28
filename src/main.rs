use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use uniqd::cli::{Cli, Command};
use uniqd::config;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Command::CheckConfig) => {
            let cfg = config::resolve_config(cli.config.as_deref())?;
            println!("Configuration is valid.");
            println!("  Listen:        {}", cfg.server.listen);
            println!("  Window:        {}s", cfg.window.interval_secs);
            println!("  Window log:    {}", cfg.window.log_path.display());
            println!(
                "  Ingest queue:  {} (overflow: {})",
                cfg.ingest.capacity, cfg.ingest.overflow
            );
            if cfg.metrics.enabled {
                println!("  Metrics:       {}", cfg.metrics.listen);
            }
            return Ok(());
        }
        Some(Command::HealthCheck { url, timeout }) => {
            let rt = tokio::runtime::Runtime::new()?;
            let target = format!("{}/livez", url.trim_end_matches('/'));
            let result = rt.block_on(async {
                let client = reqwest::Client::builder()
                    .timeout(std::time::Duration::from_secs(*timeout))
                    .build()?;
                let resp = client.get(&target).send().await?;
                if !resp.status().is_success() {
                    anyhow::bail!("HTTP {}", resp.status());
                }
                Ok::<_, anyhow::Error>(())
            });
            match result {
                Ok(()) => {
                    println!("OK: {} is healthy", target);
                    return Ok(());
                }
                Err(e) => {
                    eprintln!("FAIL: {}: {}", target, e);
                    std::process::exit(1);
                }
            }
        }
        None => {}
    }

    let app_config = config::resolve_config(cli.config.as_deref())?;

    // CLI override > env > config file
    let log_level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| app_config.logging.level.to_string());
    uniqd::logging::setup_logging(&log_level, app_config.logging.format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %app_config.server.listen,
        "Starting uniqd"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        if let Err(e) = uniqd::server::run(app_config).await {
            error!(error = %e, "Server error");
            std::process::exit(1);
        }
    });

    Ok(())
}
