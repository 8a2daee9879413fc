//! Admission-controlled access to upstream JSON APIs

use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::Result;
use crate::config::Config;
use crate::failsafe::AdmissionController;
use crate::transport::{HttpTransport, ReqwestTransport};

/// Transport plus the admission controller every request goes through.
///
/// Cloning is cheap; clones share the same budgets.
#[derive(Clone)]
pub struct SourceClient {
    transport: Arc<dyn HttpTransport>,
    admission: Arc<AdmissionController>,
}

impl SourceClient {
    /// Create a client over a shared transport and controller
    pub fn new(transport: Arc<dyn HttpTransport>, admission: Arc<AdmissionController>) -> Self {
        Self {
            transport,
            admission,
        }
    }

    /// Production client: reqwest transport behind a fresh controller
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(&config.http)?);
        let admission = Arc::new(AdmissionController::new(config.admission.clone()));
        Ok(Self::new(transport, admission))
    }

    /// The shared admission controller
    #[must_use]
    pub fn admission(&self) -> &Arc<AdmissionController> {
        &self.admission
    }

    /// GET `url` under admission control
    ///
    /// # Errors
    ///
    /// Returns the upstream error unchanged after logging it.
    pub async fn get(&self, source: &str, url: &str) -> Result<Value> {
        self.admission
            .request(url, || self.transport.get_json(url))
            .await
            .inspect_err(|e| warn!(source = source, url = url, error = %e, "Upstream request failed"))
    }

    /// POST `body` to `url` under admission control
    ///
    /// # Errors
    ///
    /// Returns the upstream error unchanged after logging it.
    pub async fn post(&self, source: &str, url: &str, body: &Value) -> Result<Value> {
        self.admission
            .request(url, || self.transport.post_json(url, body))
            .await
            .inspect_err(|e| warn!(source = source, url = url, error = %e, "Upstream request failed"))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::Instant;

    use super::*;
    use crate::intelligence::mock::{self, MockTransport, Reply};

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_then_served() {
        let mock = Arc::new(
            MockTransport::new()
                .route("llama.test/tvl", Reply::RateLimited(Some("2")))
                .json("llama.test/tvl", json!(1.5e9)),
        );
        let client = mock::client(&mock);

        let started = Instant::now();
        let value = client.get("tvl", "http://llama.test/tvl/aave").await.unwrap();

        assert_eq!(value, json!(1.5e9));
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        assert_eq!(mock.urls().len(), 2);
        assert_eq!(client.admission().in_flight_window("llama.test"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_exhausted_is_returned() {
        let mock = Arc::new(
            MockTransport::new().route("santiment.test", Reply::RateLimited(None)),
        );
        let client = mock::client(&mock);

        let err = client
            .post("sentiment", "http://santiment.test/graphql", &json!({}))
            .await
            .unwrap_err();

        assert!(err.is_rate_limited());
        assert_eq!(err.retry_after(), None);
        // first attempt plus three retries
        assert_eq!(mock.calls().len(), 4);
    }
}
