use chrono::{TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;
use uniqd::metrics::MetricsRegistry;
use uniqd::window_log::{WindowLog, WindowSummary};

fn summary(count: usize, minute: u32) -> WindowSummary {
    WindowSummary {
        closed_at: Utc.with_ymd_and_hms(2026, 5, 4, 10, minute, 0).unwrap(),
        unique_count: count,
    }
}

#[tokio::test]
async fn test_lines_written_in_order_and_flushed_on_close() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("windows.log");

    let log = WindowLog::open(&path).await.unwrap();
    let (tx, handle) = log.spawn_writer(Arc::new(MetricsRegistry::new()));
    tx.send(summary(3, 1)).await.unwrap();
    tx.send(summary(0, 2)).await.unwrap();
    drop(tx);
    handle.await.unwrap();

    let content = tokio::fs::read_to_string(&path).await.unwrap();
    assert_eq!(
        content,
        "2026-05-04T10:01:00Z - Unique requests in the last minute: 3\n\
         2026-05-04T10:02:00Z - Unique requests in the last minute: 0\n"
    );
}

#[tokio::test]
async fn test_appends_to_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("windows.log");
    std::fs::write(&path, "previous run\n").unwrap();

    let log = WindowLog::open(&path).await.unwrap();
    let (tx, handle) = log.spawn_writer(Arc::new(MetricsRegistry::new()));
    tx.send(summary(7, 3)).await.unwrap();
    drop(tx);
    handle.await.unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "previous run");
    assert!(lines[1].ends_with("Unique requests in the last minute: 7"));
}

#[tokio::test]
async fn test_open_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("windows.log");

    let log = WindowLog::open(&path).await.unwrap();
    assert_eq!(log.path(), path.as_path());
    assert!(path.exists());
}

#[tokio::test]
async fn test_open_fails_on_directory() {
    let dir = TempDir::new().unwrap();
    let err = WindowLog::open(dir.path()).await.err().unwrap();
    assert!(format!("{err:#}").contains("opening window log"));
}
