#[allow(dead_code)]
mod helpers;

use helpers::{logged_count, start_callback_receiver, start_service, start_service_with};
use axum::http::StatusCode;
use tokio::time::{sleep, Duration};

#[tokio::test]
async fn test_single_id_counted_in_first_window() {
    let svc = start_service(1).await;
    assert_eq!(svc.get("/api/verve/accept?id=1").await.1, "ok");

    let lines = svc.wait_for_log_lines(1, Duration::from_secs(5)).await;
    assert!(!lines.is_empty(), "no window line written");
    assert!(lines[0].contains(" - Unique requests in the last minute: "));
    assert_eq!(logged_count(&lines[0]), 1);

    // RFC3339 timestamp prefix
    let timestamp = lines[0].split(" - ").next().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    svc.stop().await.unwrap();
}

#[tokio::test]
async fn test_duplicates_notify_once_with_running_count() {
    let receiver = start_callback_receiver(StatusCode::OK).await;
    let svc = start_service(2).await;

    assert_eq!(svc.get("/api/verve/accept?id=1").await.0, 200);
    let with_endpoint = format!("/api/verve/accept?id=2&endpoint={}", receiver.url());
    assert_eq!(svc.get(&with_endpoint).await.0, 200);
    assert_eq!(svc.get("/api/verve/accept?id=1").await.0, 200);
    // Same identifier with an endpoint is still a duplicate
    assert_eq!(svc.get(&with_endpoint).await.0, 200);

    let lines = svc.wait_for_log_lines(1, Duration::from_secs(6)).await;
    assert_eq!(logged_count(&lines[0]), 2);

    let calls = receiver.calls();
    assert_eq!(calls.len(), 1, "expected exactly one callback: {calls:?}");
    assert_eq!(calls[0].body, serde_json::json!({ "unique_count": 2 }));
    assert_eq!(calls[0].content_type.as_deref(), Some("application/json"));
    svc.stop().await.unwrap();
}

#[tokio::test]
async fn test_identifier_counts_again_in_next_window() {
    let receiver = start_callback_receiver(StatusCode::OK).await;
    let svc = start_service(1).await;
    let path = format!("/api/verve/accept?id=5&endpoint={}", receiver.url());

    assert_eq!(svc.get(&path).await.0, 200);
    let lines = svc.wait_for_log_lines(1, Duration::from_secs(5)).await;
    assert_eq!(logged_count(&lines[0]), 1);

    assert_eq!(svc.get(&path).await.0, 200);
    let calls = receiver.wait_for(2, Duration::from_secs(5)).await;
    assert_eq!(calls.len(), 2);
    for call in &calls {
        assert_eq!(call.body["unique_count"], 1);
    }
    svc.stop().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_callback_does_not_stall_accounting() {
    let dead = format!("http://127.0.0.1:{}/cb", crate::helpers::free_port().await);
    let svc = start_service(1).await;

    for id in 0..20 {
        let path = format!("/api/verve/accept?id={id}&endpoint={dead}");
        assert_eq!(svc.get(&path).await.0, 200);
    }

    let lines = svc.wait_for_log_lines(1, Duration::from_secs(5)).await;
    assert_eq!(logged_count(&lines[0]), 20);
    svc.stop().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_stops_listener_and_keeps_log() {
    let svc = start_service_with(60, |cfg| cfg.server.shutdown_timeout = 2).await;
    let addr = svc.addr;
    let log_path = svc.log_path.clone();
    assert_eq!(svc.get("/api/verve/accept?id=9").await.0, 200);

    let dir_guard = svc.stop_keep_dir().await;
    assert!(log_path.exists());

    sleep(Duration::from_millis(50)).await;
    assert!(reqwest::get(format!("http://{addr}/livez")).await.is_err());
    drop(dir_guard);
}
