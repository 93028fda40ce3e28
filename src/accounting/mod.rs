//! The accounting engine.
//!
//! A single task owns the current window and drains two event sources, the
//! ingest queue and the window ticker, one event at a time. The identifier set
//! is never shared with another task.

pub mod dedup;

use crate::ingest::Record;
use crate::metrics::MetricsRegistry;
use crate::notifier::types::NotificationRequest;
use crate::notifier::Notifier;
use crate::window_log::WindowSummary;
use chrono::{DateTime, Utc};
use dedup::Deduplicator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Outcome of offering a record to the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Identifier already counted in this window.
    Duplicate,
    New {
        unique_count: usize,
        /// Present when the record carried a callback target.
        notification: Option<NotificationRequest>,
    },
}

/// The open window: its identifier set and when it was opened.
#[derive(Debug)]
pub struct Window {
    seen: Deduplicator,
    opened_at: DateTime<Utc>,
}

impl Window {
    pub fn new(opened_at: DateTime<Utc>) -> Self {
        Self {
            seen: Deduplicator::new(),
            opened_at,
        }
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn unique_count(&self) -> usize {
        self.seen.len()
    }

    pub fn contains(&self, identifier: i64) -> bool {
        self.seen.contains(identifier)
    }

    pub fn admit(&mut self, record: Record) -> Admission {
        match self.seen.insert(record.identifier) {
            None => Admission::Duplicate,
            Some(unique_count) => Admission::New {
                unique_count,
                notification: record
                    .callback_target
                    .filter(|t| !t.is_empty())
                    .map(|target_url| NotificationRequest {
                        target_url,
                        unique_count,
                    }),
            },
        }
    }

    /// Close the window at `now`: snapshot the count and start an empty one.
    pub fn rotate(&mut self, now: DateTime<Utc>) -> WindowSummary {
        let unique_count = self.seen.reset();
        self.opened_at = now;
        WindowSummary {
            closed_at: now,
            unique_count,
        }
    }
}

/// Serialized consumer of records and ticks.
pub struct AccountingLoop {
    receiver: mpsc::Receiver<Record>,
    window: Window,
    interval: Duration,
    notifier: Notifier,
    summaries: mpsc::Sender<WindowSummary>,
    metrics: Arc<MetricsRegistry>,
    shutdown: CancellationToken,
}

impl AccountingLoop {
    pub fn new(
        receiver: mpsc::Receiver<Record>,
        interval: Duration,
        notifier: Notifier,
        summaries: mpsc::Sender<WindowSummary>,
        metrics: Arc<MetricsRegistry>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            receiver,
            window: Window::new(Utc::now()),
            interval,
            notifier,
            summaries,
            metrics,
            shutdown,
        }
    }

    /// Run until shutdown is requested or every producer is gone.
    ///
    /// Records still buffered when the loop stops are discarded.
    pub async fn run(mut self) {
        // First tick one full interval after start; a late tick is delayed, never doubled.
        let mut ticker =
            tokio::time::interval_at(tokio::time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = self.interval.as_secs_f64(), "Accounting loop started");

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => self.on_tick(),
                next = self.receiver.recv() => match next {
                    Some(record) => self.on_record(record),
                    None => {
                        info!("Ingest queue closed by all producers");
                        break;
                    }
                },
            }
        }

        self.receiver.close();
        let mut discarded = 0usize;
        while self.receiver.try_recv().is_ok() {
            discarded += 1;
        }
        info!(
            discarded,
            open_window_unique = self.window.unique_count(),
            "Accounting loop stopped"
        );
    }

    fn on_record(&mut self, record: Record) {
        let identifier = record.identifier;
        match self.window.admit(record) {
            Admission::Duplicate => {
                self.metrics.records_duplicate_total.inc();
                debug!(id = identifier, "Duplicate identifier");
            }
            Admission::New {
                unique_count,
                notification,
            } => {
                self.metrics.identifiers_new_total.inc();
                self.metrics.window_unique_current.set(unique_count as i64);
                debug!(id = identifier, unique_count, "New identifier");
                if let Some(request) = notification {
                    self.notifier.dispatch(request);
                }
            }
        }
    }

    fn on_tick(&mut self) {
        let summary = self.window.rotate(Utc::now());
        self.metrics.windows_rotated_total.inc();
        self.metrics.window_unique_current.set(0);
        self.metrics
            .window_unique_last
            .set(summary.unique_count as i64);
        info!(unique_count = summary.unique_count, "Window rotated");

        match self.summaries.try_send(summary) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.window_log_write_errors_total.inc();
                warn!(
                    unique_count = summary.unique_count,
                    "Window log writer is backed up, dropping line"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.metrics.window_log_write_errors_total.inc();
                error!(
                    unique_count = summary.unique_count,
                    "Window log writer is gone, dropping line"
                );
            }
        }
    }
}
