//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use defi_insight::config::{AdmissionConfig, Config, HttpConfig, RateBudget, SourcesConfig};
use defi_insight::failsafe::AdmissionController;
use defi_insight::intelligence::SourceClient;
use defi_insight::transport::ReqwestTransport;
use tokio::net::TcpListener;

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Budgets loose enough never to wait, with a short 429 fallback delay
pub fn admission() -> AdmissionConfig {
    AdmissionConfig {
        default: RateBudget {
            max_requests: 100,
            window: Duration::from_secs(60),
        },
        domains: Default::default(),
        max_retries: 3,
        default_retry_after: Duration::from_secs(1),
    }
}

/// Every source pointed at one local server
pub fn config_for(base: &str) -> Config {
    Config {
        sources: SourcesConfig {
            llama_url: base.to_string(),
            yields_url: base.to_string(),
            safety_url: format!("{base}/v1"),
            santiment_url: format!("{base}/santiment"),
            snapshot_url: format!("{base}/snapshot"),
            tally_url: format!("{base}/tally"),
            prices_url: format!("{base}/api/v3"),
        },
        admission: admission(),
        http: HttpConfig {
            request_timeout: Duration::from_secs(5),
            ..HttpConfig::default()
        },
        ..Config::default()
    }
}

/// Real reqwest transport behind a fresh controller
pub fn client(config: &Config) -> SourceClient {
    SourceClient::new(
        Arc::new(ReqwestTransport::new(&config.http).unwrap()),
        Arc::new(AdmissionController::new(config.admission.clone())),
    )
}
