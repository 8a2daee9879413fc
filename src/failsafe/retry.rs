//! Admission-controlled requests with 429 retry

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use super::{AdmissionController, domain_of};
use crate::Result;

impl AdmissionController {
    /// Run one upstream call under admission control, retrying HTTP 429
    /// up to the configured `max_retries`.
    ///
    /// # Errors
    ///
    /// Returns the error from `f` unchanged: immediately for anything other
    /// than a 429, and after the retry budget is spent for a 429.
    pub async fn request<T, F, Fut>(&self, url: &str, f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.request_with_retries(url, self.config().max_retries, f)
            .await
    }

    /// [`request`](Self::request) with an explicit retry budget.
    ///
    /// Every attempt, including retries, first acquires a slot for the
    /// URL's domain. A 429 waits for the server's `retry-after` seconds, or
    /// the configured default when the header is absent or unusable.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn request_with_retries<T, F, Fut>(
        &self,
        url: &str,
        retries: u32,
        mut f: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let domain = domain_of(url);
        let mut remaining = retries;

        loop {
            self.acquire(&domain).await;

            let err = match f().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !err.is_rate_limited() {
                return Err(err);
            }

            if remaining == 0 {
                debug!(
                    url = url,
                    retries = retries,
                    "Rate limit retries exhausted"
                );
                return Err(err);
            }

            let delay = parse_retry_after(err.retry_after(), self.config().default_retry_after);
            remaining -= 1;
            warn!(
                url = url,
                domain = %domain,
                delay_ms = delay.as_millis(),
                retries_left = remaining,
                "Upstream rate limited, retrying after delay"
            );
            sleep(delay).await;
        }
    }
}

/// Seconds from a `retry-after` header.
///
/// Leading decimal digits are read as whole seconds, so `"30"` and `"30.5"`
/// both give 30s. Absent, non-numeric (including HTTP-date) and zero values
/// fall back to `default`.
#[must_use]
pub fn parse_retry_after(header: Option<&str>, default: Duration) -> Duration {
    header
        .map(str::trim_start)
        .and_then(|value| {
            let digits_end = value
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(value.len());
            value[..digits_end].parse::<u64>().ok()
        })
        .filter(|&secs| secs > 0)
        .map_or(default, Duration::from_secs)
}
