//! End-to-end checks against a running guard server.

use std::time::Duration;

use serde_json::{json, Value};
use submission_guard::config::RateLimitPolicy;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use submission_guard::GuardConfig;

mod common;

#[tokio::test]
async fn test_seal_then_verify_over_http() {
    let server = common::start_server(GuardConfig::default()).await;
    let client = reqwest::Client::new();

    let sealed: Value = client
        .post(server.url("/submissions/seal"))
        .json(&json!({"name": "Jane", "age": 30}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(sealed["_integrity"]["version"], "1.0");
    assert_eq!(sealed["_integrity"]["hash"].as_str().unwrap().len(), 64);

    let verdict: Value = client
        .post(server.url("/submissions/verify"))
        .json(&sealed)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(verdict, json!({"valid": true}));

    let mut tampered = sealed.clone();
    tampered["age"] = json!(31);
    let verdict: Value = client
        .post(server.url("/submissions/verify"))
        .json(&tampered)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(verdict["valid"], false);
    assert_eq!(verdict["code"], "hash_mismatch");

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_duplicate_check_over_http() {
    let server = common::start_server(GuardConfig::default()).await;
    let client = reqwest::Client::new();

    let body = json!({
        "submission": {"id": "s-9", "title": "Quarterly report", "owner": "jane"},
        "existing": [
            {"id": "s-1", "title": "Annual review", "owner": "john"},
            {"id": "s-2", "title": "Quarterly report", "owner": "jane"},
        ],
    });
    let response = client
        .post(server.url("/submissions/duplicates"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let found: Value = response.json().await.unwrap();
    assert_eq!(found["isDuplicate"], true);
    assert_eq!(found["index"], 1);
    assert_eq!(found["duplicateOf"], "s-2");
    assert_eq!(found["matchedBy"], "similarity");
    assert_eq!(found["similarity"], 1.0);

    let response = client
        .post(server.url("/submissions/duplicates"))
        .json(&json!({"submission": {"id": "b"}, "existing": [{"id": "a"}]}))
        .send()
        .await
        .unwrap();
    let found: Value = response.json().await.unwrap();
    assert_eq!(found, json!({"isDuplicate": false}));

    let response = client
        .post(server.url("/submissions/duplicates"))
        .json(&json!({"submission": {"title": "x"}, "existing": [], "threshold": 1.5}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["code"], "INVALID_THRESHOLD");

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_submission_limit_returns_429_with_retry_after() {
    let mut config = GuardConfig::default();
    config.rate_limit.submission = RateLimitPolicy::new(3, 60_000);
    let server = common::start_server(config).await;
    let client = reqwest::Client::new();

    for expected_remaining in ["2", "1", "0"] {
        let response = client
            .post(server.url("/submissions/seal"))
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .json(&json!({"title": "draft"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["x-ratelimit-limit"], "3");
        assert_eq!(response.headers()["x-ratelimit-remaining"], expected_remaining);
    }

    let response = client
        .post(server.url("/submissions/seal"))
        .header("x-forwarded-for", "203.0.113.7")
        .json(&json!({"title": "draft"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 429);
    let retry_after: u64 = response.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 60);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "RATE_LIMITED");

    // A different client and a non-submission route are unaffected.
    let response = client
        .post(server.url("/submissions/seal"))
        .header("x-forwarded-for", "198.51.100.1")
        .json(&json!({"title": "draft"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .get(server.url("/health"))
        .header("x-forwarded-for", "203.0.113.7")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    server.shutdown.trigger();
}

#[tokio::test]
async fn test_server_stops_on_shutdown() {
    let server = common::start_server(GuardConfig::default()).await;

    let response = reqwest::get(server.url("/health")).await.unwrap();
    assert_eq!(response.status(), 200);

    server.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), server.handle)
        .await
        .expect("server did not stop within 5s")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_in_flight_request_completes_during_shutdown() {
    let server = common::start_server(GuardConfig::default()).await;
    let body = br#"{"title":"draft"}"#;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    let head = format!(
        "POST /submissions/seal HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
        server.addr,
        body.len()
    );
    stream.write_all(head.as_bytes()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Headers are in, body is not: the request is mid-flight.
    server.shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(50)).await;
    stream.write_all(body).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("response did not arrive within 5s")
        .unwrap();
    let response = String::from_utf8_lossy(&response);
    assert!(response.starts_with("HTTP/1.1 200"), "unexpected response: {response}");
    assert!(response.contains("_integrity"));

    let result = tokio::time::timeout(Duration::from_secs(5), server.handle)
        .await
        .expect("server did not stop within 5s")
        .unwrap();
    assert!(result.is_ok());
}
