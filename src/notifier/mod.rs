pub mod types;

use crate::config::types::NotifierConfig;
use crate::metrics::{notify_outcomes, MetricsRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, TryAcquireError};
use tracing::{debug, warn};
use types::{NotificationPayload, NotificationRequest};

/// Fire-and-forget callback dispatcher.
///
/// Each notification runs in its own detached task; a delivery is attempted
/// once and its outcome only logged and counted. At most `max_concurrent`
/// deliveries are in flight; a notification arriving while all slots are
/// busy is dropped.
#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    semaphore: Arc<Semaphore>,
    metrics: Arc<MetricsRegistry>,
}

impl Notifier {
    pub fn new(config: &NotifierConfig, metrics: Arc<MetricsRegistry>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            metrics,
        })
    }

    /// Spawn delivery of `request` and return immediately.
    pub fn dispatch(&self, request: NotificationRequest) {
        let permit = match self.semaphore.clone().try_acquire_owned() {
            Ok(p) => p,
            Err(TryAcquireError::NoPermits) => {
                warn!(
                    url = %request.target_url,
                    unique_count = request.unique_count,
                    "All notification slots busy, dropping notification"
                );
                self.metrics.record_notification(notify_outcomes::DROPPED);
                return;
            }
            Err(TryAcquireError::Closed) => {
                warn!(url = %request.target_url, "Notifier closed, dropping notification");
                self.metrics.record_notification(notify_outcomes::DROPPED);
                return;
            }
        };
        let client = self.client.clone();
        let metrics = self.metrics.clone();

        tokio::spawn(async move {
            let _permit = permit;

            match send_notification(&client, &request).await {
                Ok(status) => {
                    debug!(
                        url = %request.target_url,
                        unique_count = request.unique_count,
                        status = %status,
                        "Notification delivered"
                    );
                    metrics.record_notification(notify_outcomes::DELIVERED);
                }
                Err(e) => {
                    warn!(
                        url = %request.target_url,
                        unique_count = request.unique_count,
                        error = %e,
                        "Notification failed"
                    );
                    metrics.record_notification(notify_outcomes::FAILED);
                }
            }
        });
    }
}

async fn send_notification(
    client: &reqwest::Client,
    request: &NotificationRequest,
) -> anyhow::Result<reqwest::StatusCode> {
    let body = serde_json::to_string(&NotificationPayload::from(request))?;

    let response = client
        .post(&request.target_url)
        .header("Content-Type", "application/json")
        .body(body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("callback returned status {}", status);
    }
    Ok(status)
}
