pub mod accounting;
pub mod api;
pub mod cli;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod notifier;
pub mod server;
pub mod window_log;
