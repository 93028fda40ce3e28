//! Bounded hand-off between request handlers and the accounting loop.

use crate::config::types::{IngestConfig, OverflowPolicy};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// A decoded request waiting to be accounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub identifier: i64,
    /// Callback URL; `None` when absent or empty.
    pub callback_target: Option<String>,
}

impl Record {
    pub fn new(identifier: i64, callback_target: Option<String>) -> Self {
        Self {
            identifier,
            callback_target: callback_target.filter(|t| !t.is_empty()),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnqueueError {
    #[error("ingest queue is full")]
    Full,
    #[error("ingest queue is closed")]
    Closed,
}

/// Producer side of the ingest queue. Cheap to clone, one per handler.
#[derive(Clone)]
pub struct IngestQueue {
    sender: mpsc::Sender<Record>,
    policy: OverflowPolicy,
    enqueue_timeout: Duration,
}

/// Create the queue; the receiver belongs to the accounting loop.
pub fn channel(config: &IngestConfig) -> (IngestQueue, mpsc::Receiver<Record>) {
    let (sender, receiver) = mpsc::channel(config.capacity);
    let queue = IngestQueue {
        sender,
        policy: config.overflow,
        enqueue_timeout: Duration::from_millis(config.enqueue_timeout_ms),
    };
    (queue, receiver)
}

impl IngestQueue {
    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// True once the accounting loop has stopped consuming.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Free slots left in the buffer.
    pub fn available(&self) -> usize {
        self.sender.capacity()
    }

    /// Hand `record` to the accounting loop, applying the overflow policy
    /// when the buffer is full.
    pub async fn enqueue(&self, record: Record) -> Result<(), EnqueueError> {
        match self.policy {
            OverflowPolicy::Block => self
                .sender
                .send(record)
                .await
                .map_err(|_| EnqueueError::Closed),
            OverflowPolicy::Reject => self.sender.try_send(record).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => EnqueueError::Full,
                mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
            }),
            OverflowPolicy::Timeout => self
                .sender
                .send_timeout(record, self.enqueue_timeout)
                .await
                .map_err(|e| match e {
                    mpsc::error::SendTimeoutError::Timeout(_) => EnqueueError::Full,
                    mpsc::error::SendTimeoutError::Closed(_) => EnqueueError::Closed,
                }),
        }
    }
}
