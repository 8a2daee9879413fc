//! Reqwest transport against a local server: status mapping and 429 retry

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use defi_insight::Error;
use defi_insight::config::HttpConfig;
use defi_insight::failsafe::AdmissionController;
use defi_insight::transport::{HttpTransport, ReqwestTransport};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn transport() -> ReqwestTransport {
    ReqwestTransport::new(&HttpConfig {
        request_timeout: Duration::from_secs(5),
        ..HttpConfig::default()
    })
    .unwrap()
}

/// Answers 429 with `retry-after: 1` once, then JSON
async fn flaky(State(hits): State<Arc<AtomicUsize>>) -> impl IntoResponse {
    if hits.fetch_add(1, Ordering::SeqCst) == 0 {
        (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "1")],
            "slow down",
        )
            .into_response()
    } else {
        axum::Json(json!({"tvl": 42})).into_response()
    }
}

async fn always_limited() -> impl IntoResponse {
    (StatusCode::TOO_MANY_REQUESTS, [(header::RETRY_AFTER, "7")], "")
}

async fn broken() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, "database unavailable")
}

async fn echo(axum::Json(body): axum::Json<Value>) -> axum::Json<Value> {
    axum::Json(json!({"received": body}))
}

#[tokio::test]
async fn test_get_and_post_json() {
    let base = common::spawn(
        Router::new()
            .route("/tvl", get(|| async { axum::Json(json!(1.5e9)) }))
            .route("/graphql", post(echo)),
    )
    .await;
    let transport = transport();

    let tvl = transport.get_json(&format!("{base}/tvl")).await.unwrap();
    assert_eq!(tvl, json!(1.5e9));

    let body = json!({"query": "{ proposals { id } }"});
    let echoed = transport
        .post_json(&format!("{base}/graphql"), &body)
        .await
        .unwrap();
    assert_eq!(echoed, json!({"received": body}));
}

#[tokio::test]
async fn test_server_error_maps_to_upstream() {
    let base = common::spawn(Router::new().route("/down", get(broken))).await;
    let url = format!("{base}/down");

    let err = transport().get_json(&url).await.unwrap_err();
    match err {
        Error::Upstream {
            url: failed,
            status,
            message,
        } => {
            assert_eq!(failed, url);
            assert_eq!(status, 500);
            assert_eq!(message, "database unavailable");
        }
        other => panic!("expected upstream error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limit_keeps_retry_after() {
    let base = common::spawn(Router::new().route("/limited", get(always_limited))).await;

    let err = transport()
        .get_json(&format!("{base}/limited"))
        .await
        .unwrap_err();
    assert!(err.is_rate_limited());
    assert_eq!(err.retry_after(), Some("7"));
}

#[tokio::test]
async fn test_429_retried_after_server_delay() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = common::spawn(
        Router::new()
            .route("/flaky", get(flaky))
            .with_state(hits.clone()),
    )
    .await;
    let url = format!("{base}/flaky");
    let transport = transport();
    let admission = AdmissionController::new(common::admission());

    let started = Instant::now();
    let value = admission
        .request(&url, || transport.get_json(&url))
        .await
        .unwrap();

    assert_eq!(value, json!({"tvl": 42}));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert!(started.elapsed() >= Duration::from_secs(1));
    // both attempts were admitted against the same host
    assert_eq!(admission.in_flight_window("127.0.0.1"), 2);
}

#[tokio::test]
async fn test_429_returned_unchanged_without_retries() {
    let hits = Arc::new(AtomicUsize::new(0));
    let base = common::spawn(
        Router::new()
            .route("/flaky", get(flaky))
            .with_state(hits.clone()),
    )
    .await;
    let url = format!("{base}/flaky");
    let transport = transport();
    let admission = AdmissionController::new(common::admission());

    let err = admission
        .request_with_retries(&url, 0, || transport.get_json(&url))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RateLimited { ref retry_after, .. } if retry_after.as_deref() == Some("1")));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_server_error_not_retried() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let base = common::spawn(Router::new().route(
        "/down",
        get(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            broken()
        }),
    ))
    .await;
    let url = format!("{base}/down");
    let transport = transport();
    let admission = AdmissionController::new(common::admission());

    let err = admission
        .request(&url, || transport.get_json(&url))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
