use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "uniqd",
    version,
    about = "Counts unique request identifiers per time window"
)]
pub struct Cli {
    /// Path to configuration file [default: ./uniqd.toml if present, else built-in defaults]
    #[arg(short, long, env = "UNIQD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error or a filter directive)
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate configuration and print the effective settings
    CheckConfig,
    /// Health check: GET /livez on a running instance
    HealthCheck {
        /// Base URL of the instance
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        url: String,
        /// Timeout in seconds
        #[arg(long, default_value = "5")]
        timeout: u64,
    },
}
