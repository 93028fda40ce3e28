use crate::accounting::AccountingLoop;
use crate::api::{self, AppState};
use crate::config::types::AppConfig;
use crate::ingest;
use crate::metrics::MetricsRegistry;
use crate::notifier::Notifier;
use crate::window_log::WindowLog;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Resources acquired before serving. Any failure here is fatal.
pub struct Prepared {
    pub config: Arc<AppConfig>,
    pub listener: TcpListener,
    pub window_log: WindowLog,
    pub metrics: Arc<MetricsRegistry>,
}

impl Prepared {
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

/// Open the window log and bind the listener.
pub async fn prepare(config: AppConfig) -> Result<Prepared> {
    let window_log = WindowLog::open(&config.window.log_path).await?;
    info!(path = %window_log.path().display(), "Window log opened");

    let listener = TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("binding {}", config.server.listen))?;

    Ok(Prepared {
        config: Arc::new(config),
        listener,
        window_log,
        metrics: Arc::new(MetricsRegistry::new()),
    })
}

/// Main entry point: prepare, then serve until SIGTERM / Ctrl-C.
pub async fn run(config: AppConfig) -> Result<()> {
    let prepared = prepare(config).await?;
    let shutdown = CancellationToken::new();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_token.cancel();
    });

    serve(prepared, shutdown).await
}

/// Wire the pipeline and serve until `shutdown` is cancelled.
///
/// Teardown order: stop accepting HTTP requests, stop the accounting loop
/// (closing the ingest queue and the ticker), then let the log writer flush
/// and close the file. Teardown runs on every exit path, including a failing
/// HTTP server.
pub async fn serve(prepared: Prepared, shutdown: CancellationToken) -> Result<()> {
    let Prepared {
        config,
        listener,
        window_log,
        metrics,
    } = prepared;

    let notifier = Notifier::new(&config.notifier, metrics.clone())?;
    let (queue, receiver) = ingest::channel(&config.ingest);
    let (summaries, writer_handle) = window_log.spawn_writer(metrics.clone());

    let accounting = AccountingLoop::new(
        receiver,
        Duration::from_secs(config.window.interval_secs),
        notifier,
        summaries,
        metrics.clone(),
        shutdown.child_token(),
    );
    let accounting_handle = tokio::spawn(accounting.run());

    let _metrics_handle = spawn_metrics_server(&config, metrics.clone(), shutdown.clone());

    info!(
        listen = %config.server.listen,
        interval_secs = config.window.interval_secs,
        queue_capacity = config.ingest.capacity,
        overflow = %config.ingest.overflow,
        "uniqd started"
    );

    let state = AppState {
        queue,
        metrics: metrics.clone(),
    };
    let serve_result = api::serve(listener, state, shutdown.clone()).await;
    if let Err(ref e) = serve_result {
        error!(error = %e, "HTTP server error");
    }

    info!("Initiating graceful shutdown");
    shutdown.cancel();
    drain(
        accounting_handle,
        writer_handle,
        Duration::from_secs(config.server.shutdown_timeout),
    )
    .await;
    info!("Graceful shutdown complete");

    serve_result
}

async fn drain(accounting: JoinHandle<()>, writer: JoinHandle<()>, timeout: Duration) {
    // The writer ends once the accounting loop drops its sender.
    let joined = tokio::time::timeout(timeout, async {
        if let Err(e) = accounting.await {
            error!(error = %e, "Accounting loop task failed");
        }
        if let Err(e) = writer.await {
            error!(error = %e, "Window log writer task failed");
        }
    })
    .await;

    if joined.is_err() {
        warn!(
            timeout_secs = timeout.as_secs(),
            "Shutdown timeout reached, abandoning remaining work"
        );
    }
}

/// Spawn the metrics server task (if configured)
fn spawn_metrics_server(
    config: &AppConfig,
    metrics: Arc<MetricsRegistry>,
    shutdown: CancellationToken,
) -> Option<JoinHandle<()>> {
    if !config.metrics.enabled {
        return None;
    }
    let listen = config.metrics.listen.clone();

    Some(tokio::spawn(async move {
        if let Err(e) = api::start_metrics_server(&listen, metrics, shutdown).await {
            error!(error = %e, "Metrics server error");
        }
    }))
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            info!("Ctrl-C received, initiating graceful shutdown");
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("SIGTERM received, initiating graceful shutdown"),
        _ = tokio::signal::ctrl_c() => info!("Ctrl-C received, initiating graceful shutdown"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Ctrl-C received, initiating graceful shutdown");
}
