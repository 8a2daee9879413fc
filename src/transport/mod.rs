//! JSON-over-HTTP transport used by the source adapters

mod http;

pub use self::http::ReqwestTransport;

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

/// Transport trait for upstream JSON APIs
///
/// Implementations map HTTP 429 to [`Error::RateLimited`](crate::Error::RateLimited)
/// (carrying the `retry-after` header) and any other non-2xx status to
/// [`Error::Upstream`](crate::Error::Upstream). Admission control and retry
/// live above this layer.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET `url` and decode the JSON body
    async fn get_json(&self, url: &str) -> Result<Value>;

    /// POST `body` as JSON to `url` and decode the JSON response
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value>;
}
