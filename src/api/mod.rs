//! HTTP transport: validates query parameters and feeds the ingest queue.

use crate::ingest::{EnqueueError, IngestQueue, Record};
use crate::metrics::{reject_reasons, MetricsRegistry};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const ACCEPT_PATH: &str = "/api/verve/accept";

#[derive(Clone)]
pub struct AppState {
    pub queue: IngestQueue,
    pub metrics: Arc<MetricsRegistry>,
}

/// Errors surfaced synchronously to the caller; none of them reach the
/// accounting loop.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Missing required parameter: id")]
    MissingId,
    #[error("Invalid id parameter")]
    InvalidId,
    #[error("Service unavailable: {0}")]
    Enqueue(#[from] EnqueueError),
}

impl RequestError {
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::MissingId | RequestError::InvalidId => StatusCode::BAD_REQUEST,
            RequestError::Enqueue(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            RequestError::MissingId => reject_reasons::MISSING_ID,
            RequestError::InvalidId => reject_reasons::INVALID_ID,
            RequestError::Enqueue(EnqueueError::Full) => reject_reasons::QUEUE_FULL,
            RequestError::Enqueue(EnqueueError::Closed) => reject_reasons::QUEUE_CLOSED,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), self.to_string()).into_response();
        if matches!(self, RequestError::Enqueue(EnqueueError::Full)) {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, header::HeaderValue::from_static("1"));
        }
        response
    }
}

/// Decode `id` and `endpoint` from the query pairs.
///
/// Only the first occurrence of each key counts. An empty `id` is treated as
/// missing and an empty `endpoint` as absent.
pub fn parse_accept_params(pairs: &[(String, String)]) -> Result<Record, RequestError> {
    let first = |key: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };

    let id = match first("id") {
        Some(v) if !v.is_empty() => v,
        _ => return Err(RequestError::MissingId),
    };
    let identifier: i64 = id.parse().map_err(|_| RequestError::InvalidId)?;
    let endpoint = first("endpoint").map(str::to_string);

    Ok(Record::new(identifier, endpoint))
}

async fn accept_handler(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<&'static str, RequestError> {
    let outcome = async {
        let record = parse_accept_params(&pairs)?;
        state.queue.enqueue(record).await?;
        Ok::<_, RequestError>(())
    }
    .await;

    match outcome {
        Ok(()) => {
            state.metrics.records_accepted_total.inc();
            Ok("ok")
        }
        Err(e) => {
            state.metrics.record_rejected(e.reason());
            if matches!(e, RequestError::Enqueue(_)) {
                warn!(error = %e, "Record rejected");
            } else {
                debug!(error = %e, "Invalid accept request");
            }
            Err(e)
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    if state.queue.is_closed() {
        (StatusCode::SERVICE_UNAVAILABLE, "ingest queue closed")
    } else {
        (StatusCode::OK, "ok")
    }
}

/// Routes served on the main listener.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(ACCEPT_PATH, get(accept_handler))
        .route("/health", get(health_handler))
        .route("/livez", get(|| async { "ok" }))
        .with_state(state)
}

/// Serve the transport on an already-bound listener until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(addr = %addr, "HTTP server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}

/// Routes served on the optional metrics listener.
pub fn metrics_router(metrics: Arc<MetricsRegistry>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(|| async { "ok" }))
        .route("/livez", get(|| async { "ok" }))
        .with_state(metrics)
}

/// Start the metrics/health HTTP server with graceful shutdown support.
pub async fn start_metrics_server(
    listen_addr: &str,
    metrics: Arc<MetricsRegistry>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(listen_addr).await?;
    info!(addr = %listen_addr, "Metrics server listening");
    axum::serve(listener, metrics_router(metrics))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}

async fn metrics_handler(State(metrics): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(buffer) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            buffer,
        )
            .into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "encoding error").into_response(),
    }
}
