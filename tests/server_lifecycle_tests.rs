use lokihose::auth::ExpectedCredentials;
use lokihose::publisher::BatchLimits;
use lokihose::server::{start_server, IngestState};
use lokihose::sink::MemoryDeliveryStream;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

#[tokio::test]
async fn test_push_over_tcp_then_graceful_shutdown() {
    let sink = Arc::new(MemoryDeliveryStream::new());
    let state = Arc::new(IngestState {
        sink: sink.clone(),
        stream_name: "tcp-stream".to_string(),
        credentials: ExpectedCredentials::new("promtail", "s3cret"),
        limits: BatchLimits::default(),
        max_body_bytes: 1024 * 1024,
        max_decompressed_bytes: 4 * 1024 * 1024,
    });

    let addr: SocketAddr = "127.0.0.1:17310".parse().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = tokio::spawn(start_server(addr, state, shutdown_rx));

    // Give the listener time to bind
    sleep(Duration::from_millis(500)).await;

    let client = reqwest::Client::new();

    let health = client
        .get("http://127.0.0.1:17310/healthz")
        .send()
        .await
        .expect("Failed to reach healthz");
    assert_eq!(health.status(), 200);

    let response = client
        .post("http://127.0.0.1:17310/loki/api/v1/push")
        .basic_auth("promtail", Some("s3cret"))
        .json(&json!({
            "streams": [{
                "stream": {"job": "tcp"},
                "values": [["1622547800000000000", "over the wire", {"trace_id": "abc"}]]
            }]
        }))
        .send()
        .await
        .expect("Failed to push");
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"status": "success", "count": 1}));

    let record: Value = serde_json::from_slice(&sink.batches()[0][0]).unwrap();
    assert_eq!(record["metadata"], json!({"trace_id": "abc"}));

    shutdown_tx.send(true).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("Server did not shut down in time")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_rejects_unauthenticated_push_over_tcp() {
    let sink = Arc::new(MemoryDeliveryStream::new());
    let state = Arc::new(IngestState {
        sink: sink.clone(),
        stream_name: "tcp-stream".to_string(),
        credentials: ExpectedCredentials::new("promtail", "s3cret"),
        limits: BatchLimits::default(),
        max_body_bytes: 1024 * 1024,
        max_decompressed_bytes: 4 * 1024 * 1024,
    });

    let addr: SocketAddr = "127.0.0.1:17311".parse().unwrap();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let server = tokio::spawn(start_server(addr, state, shutdown_rx));

    sleep(Duration::from_millis(500)).await;

    let response = reqwest::Client::new()
        .post("http://127.0.0.1:17311/loki/api/v1/push")
        .basic_auth("promtail", Some("guess"))
        .body(r#"{"streams":[]}"#)
        .send()
        .await
        .expect("Failed to push");

    assert_eq!(response.status(), 401);
    assert_eq!(
        response.headers().get("www-authenticate").unwrap(),
        "Basic realm=\"Secure Area\""
    );
    assert!(sink.batches().is_empty());

    shutdown_tx.send(true).unwrap();
    let _ = server.await;
}
