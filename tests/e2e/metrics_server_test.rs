#[allow(dead_code)]
mod helpers;

use helpers::{free_port, start_service_with};
use tokio::time::{sleep, Duration};

#[tokio::test]
async fn test_metrics_endpoint_reports_counters() {
    let port = free_port().await;
    let svc = start_service_with(60, |cfg| {
        cfg.metrics.enabled = true;
        cfg.metrics.listen = format!("127.0.0.1:{port}");
    })
    .await;

    assert_eq!(svc.get("/api/verve/accept?id=1").await.0, 200);
    assert_eq!(svc.get("/api/verve/accept?id=1").await.0, 200);
    assert_eq!(svc.get("/api/verve/accept?id=oops").await.0, 400);
    sleep(Duration::from_millis(200)).await;

    let resp = reqwest::get(format!("http://127.0.0.1:{port}/metrics"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let text = resp.text().await.unwrap();
    assert!(text.contains("uniqd_records_accepted_total 2"), "{text}");
    assert!(text.contains("uniqd_identifiers_new_total 1"), "{text}");
    assert!(text.contains("uniqd_records_duplicate_total 1"), "{text}");
    assert!(
        text.contains("uniqd_requests_rejected_total{reason=\"invalid_id\"} 1"),
        "{text}"
    );
    assert!(text.contains("uniqd_window_unique_current 1"), "{text}");

    let health = reqwest::get(format!("http://127.0.0.1:{port}/health"))
        .await
        .unwrap();
    assert_eq!(health.status(), 200);
    svc.stop().await.unwrap();
}
