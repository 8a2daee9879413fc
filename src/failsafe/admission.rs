//! Per-domain sliding-window admission control

use std::collections::VecDeque;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::{Instant, sleep};
use tracing::debug;
use url::Url;

use crate::config::{AdmissionConfig, RateBudget};

/// Partition key used when a URL has no parseable host
pub const DEFAULT_DOMAIN: &str = "default";

/// Shares outbound request budgets across upstream domains.
///
/// Each domain keeps the instants of the requests admitted within its
/// trailing window. A caller over budget is suspended until the oldest
/// admission leaves the window. Histories are independent per domain;
/// a `DashMap` shard lock is held only while pruning and appending, never
/// across an await.
pub struct AdmissionController {
    config: AdmissionConfig,
    history: DashMap<String, VecDeque<Instant>>,
}

impl AdmissionController {
    /// Create a controller with the given budgets
    #[must_use]
    pub fn new(config: AdmissionConfig) -> Self {
        Self {
            config,
            history: DashMap::new(),
        }
    }

    /// Configured budgets
    #[must_use]
    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Budget applying to `domain`
    #[must_use]
    pub fn budget_for(&self, domain: &str) -> RateBudget {
        self.config.budget_for(domain)
    }

    /// Wait for a slot in `domain`'s window and record the admission.
    pub async fn acquire(&self, domain: &str) {
        let budget = self.budget_for(domain);
        let max_requests = usize::try_from(budget.max_requests.max(1)).unwrap_or(usize::MAX);

        loop {
            let wait = {
                let mut admitted = self.history.entry(domain.to_string()).or_default();
                let now = Instant::now();
                prune(&mut admitted, now, budget.window);

                if admitted.len() < max_requests {
                    admitted.push_back(now);
                    return;
                }

                admitted.front().map_or(Duration::ZERO, |&oldest| {
                    budget.window.saturating_sub(now.duration_since(oldest))
                })
            };

            debug!(
                domain = domain,
                wait_ms = wait.as_millis(),
                max_requests = budget.max_requests,
                "Admission budget exhausted, waiting for window slot"
            );
            sleep(wait).await;
        }
    }

    /// Admissions currently inside `domain`'s window
    #[must_use]
    pub fn in_flight_window(&self, domain: &str) -> usize {
        let window = self.budget_for(domain).window;
        let now = Instant::now();
        self.history.get(domain).map_or(0, |admitted| {
            admitted
                .iter()
                .filter(|&&at| now.duration_since(at) < window)
                .count()
        })
    }
}

/// Drop admissions at least `window` old
fn prune(admitted: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = admitted.front() {
        if now.duration_since(oldest) < window {
            break;
        }
        admitted.pop_front();
    }
}

/// Admission partition for `url`: its host, or [`DEFAULT_DOMAIN`].
#[must_use]
pub fn domain_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| DEFAULT_DOMAIN.to_string())
}
