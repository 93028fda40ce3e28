use std::time::Duration;
use uniqd::config::types::{IngestConfig, OverflowPolicy};
use uniqd::ingest::{self, EnqueueError, Record};

fn config(capacity: usize, overflow: OverflowPolicy, enqueue_timeout_ms: u64) -> IngestConfig {
    IngestConfig {
        capacity,
        overflow,
        enqueue_timeout_ms,
    }
}

#[tokio::test]
async fn test_fifo_order() {
    let (queue, mut rx) = ingest::channel(&config(8, OverflowPolicy::Reject, 0));
    for id in [3, 1, 2] {
        queue.enqueue(Record::new(id, None)).await.unwrap();
    }
    assert_eq!(rx.recv().await.unwrap().identifier, 3);
    assert_eq!(rx.recv().await.unwrap().identifier, 1);
    assert_eq!(rx.recv().await.unwrap().identifier, 2);
}

#[tokio::test]
async fn test_reject_policy_fails_fast_when_full() {
    let (queue, _rx) = ingest::channel(&config(1, OverflowPolicy::Reject, 0));
    queue.enqueue(Record::new(1, None)).await.unwrap();
    assert_eq!(queue.available(), 0);
    assert_eq!(
        queue.enqueue(Record::new(2, None)).await,
        Err(EnqueueError::Full)
    );
}

#[tokio::test]
async fn test_timeout_policy_waits_then_fails() {
    let (queue, _rx) = ingest::channel(&config(1, OverflowPolicy::Timeout, 50));
    queue.enqueue(Record::new(1, None)).await.unwrap();

    let started = std::time::Instant::now();
    assert_eq!(
        queue.enqueue(Record::new(2, None)).await,
        Err(EnqueueError::Full)
    );
    assert!(started.elapsed() >= Duration::from_millis(40));
}

#[tokio::test]
async fn test_timeout_policy_succeeds_when_space_frees() {
    let (queue, mut rx) = ingest::channel(&config(1, OverflowPolicy::Timeout, 2_000));
    queue.enqueue(Record::new(1, None)).await.unwrap();

    let producer = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.enqueue(Record::new(2, None)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(rx.recv().await.unwrap().identifier, 1);

    assert_eq!(producer.await.unwrap(), Ok(()));
    assert_eq!(rx.recv().await.unwrap().identifier, 2);
}

#[tokio::test]
async fn test_block_policy_waits_for_space() {
    let (queue, mut rx) = ingest::channel(&config(1, OverflowPolicy::Block, 0));
    queue.enqueue(Record::new(1, None)).await.unwrap();

    let producer = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.enqueue(Record::new(2, None)).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!producer.is_finished(), "producer should still be blocked");

    assert_eq!(rx.recv().await.unwrap().identifier, 1);
    assert_eq!(producer.await.unwrap(), Ok(()));
}

#[tokio::test]
async fn test_closed_queue_for_every_policy() {
    for policy in [
        OverflowPolicy::Block,
        OverflowPolicy::Reject,
        OverflowPolicy::Timeout,
    ] {
        let (queue, rx) = ingest::channel(&config(4, policy, 10));
        drop(rx);
        assert!(queue.is_closed());
        assert_eq!(
            queue.enqueue(Record::new(1, None)).await,
            Err(EnqueueError::Closed),
            "policy {policy}"
        );
    }
}

#[tokio::test]
async fn test_blocked_producer_released_on_close() {
    let (queue, mut rx) = ingest::channel(&config(1, OverflowPolicy::Block, 0));
    queue.enqueue(Record::new(1, None)).await.unwrap();

    let producer = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.enqueue(Record::new(2, None)).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    rx.close();

    assert_eq!(producer.await.unwrap(), Err(EnqueueError::Closed));
}
