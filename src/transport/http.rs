//! reqwest-backed transport

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde_json::Value;
use tracing::debug;

use super::HttpTransport;
use crate::config::HttpConfig;
use crate::{Error, Result};

/// Longest response body excerpt kept in an upstream error
const ERROR_BODY_LIMIT: usize = 200;

/// HTTP transport over a pooled `reqwest` client
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with the configured deadline and user agent
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Value> {
        let response = request
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let response = check_status(url, response).await?;
        let value = response.json::<Value>().await?;
        debug!(url = url, "Upstream response decoded");
        Ok(value)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get_json(&self, url: &str) -> Result<Value> {
        self.send(url, self.client.get(url)).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        self.send(url, self.client.post(url).json(body)).await
    }
}

/// Map 429 and other non-2xx responses onto the error taxonomy
async fn check_status(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        return Err(Error::RateLimited {
            url: url.to_string(),
            retry_after,
        });
    }

    let reason = status.canonical_reason().unwrap_or("Unknown status");
    let message = match response.text().await {
        Ok(body) if !body.trim().is_empty() => body.chars().take(ERROR_BODY_LIMIT).collect(),
        _ => reason.to_string(),
    };

    Err(Error::Upstream {
        url: url.to_string(),
        status: status.as_u16(),
        message,
    })
}
