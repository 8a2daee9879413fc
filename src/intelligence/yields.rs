//! Yield pools with per-pool risk scoring

use serde_json::Value;
use tracing::debug;

use super::{SourceClient, endpoint, number, text};
use crate::config::SourcesConfig;
use crate::metrics::pool_risk;
use crate::{Result, YieldOpportunity, YieldRequirements};

/// Fetches a protocol's pools from the yields API
pub struct YieldAdapter {
    client: SourceClient,
    url: String,
}

impl YieldAdapter {
    /// Create the adapter
    pub fn new(client: SourceClient, sources: &SourcesConfig) -> Self {
        Self {
            client,
            url: sources.yields_url.clone(),
        }
    }

    /// All pools of `protocol`, in upstream order.
    ///
    /// Pools tagged with another project are dropped. Every numeric field
    /// defaults to 0 and rewards to empty; risk follows the point formula
    /// on those values with no special case for sparse entries.
    ///
    /// # Errors
    ///
    /// Returns the upstream failure unchanged.
    pub async fn opportunities(&self, protocol: &str) -> Result<Vec<YieldOpportunity>> {
        let url = endpoint(&self.url, &format!("pools?project={protocol}"));
        let response = self.client.get("yields", &url).await?;

        let pools: Vec<YieldOpportunity> = response["data"]
            .as_array()
            .map(|pools| {
                pools
                    .iter()
                    .filter(|pool| belongs_to(pool, protocol))
                    .map(|pool| normalize(protocol, pool))
                    .collect()
            })
            .unwrap_or_default();

        debug!(protocol = protocol, pools = pools.len(), "Yield pools fetched");
        Ok(pools)
    }
}

fn belongs_to(pool: &Value, protocol: &str) -> bool {
    pool["project"]
        .as_str()
        .is_none_or(|project| project.eq_ignore_ascii_case(protocol))
}

fn normalize(protocol: &str, pool: &Value) -> YieldOpportunity {
    let apy = number(&pool["apy"]);
    let tvl = number(&pool["tvlUsd"]);

    YieldOpportunity {
        protocol: protocol.to_string(),
        pool: text(&pool["pool"]),
        apy,
        tvl,
        risk: pool_risk(tvl, number(&pool["apyPct1D"]), apy),
        rewards: pool["rewards"]
            .as_array()
            .map(|r| r.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default(),
        requirements: YieldRequirements {
            min_deposit: number(&pool["minDeposit"]),
            lockup_period: number(&pool["lockupPeriod"]),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::RiskLevel;
    use crate::intelligence::mock::{self, MockTransport};

    fn adapter(mock: &Arc<MockTransport>) -> YieldAdapter {
        YieldAdapter::new(mock::client(mock), &mock::sources())
    }

    #[tokio::test]
    async fn test_pools_normalized() {
        let mock = Arc::new(MockTransport::new().json(
            "yields.test/pools?project=aave",
            json!({"status": "success", "data": [
                {
                    "pool": "aave-usdc", "project": "aave", "apy": 4.2,
                    "tvlUsd": 5.0e8, "apyPct1D": 0.3,
                    "rewards": ["AAVE", "stkAAVE"], "minDeposit": 100, "lockupPeriod": 7
                },
                {
                    "pool": "aave-degen", "project": "aave", "apy": 85.0,
                    "tvlUsd": 2.0e5, "apyPct1D": 35.0
                }
            ]}),
        ));

        let pools = adapter(&mock).opportunities("aave").await.unwrap();
        assert_eq!(pools.len(), 2);

        assert_eq!(pools[0].pool, "aave-usdc");
        assert_eq!(pools[0].risk, RiskLevel::Low);
        assert_eq!(pools[0].rewards, vec!["AAVE".to_string(), "stkAAVE".to_string()]);
        assert!((pools[0].requirements.min_deposit - 100.0).abs() < f64::EPSILON);
        assert!((pools[0].requirements.lockup_period - 7.0).abs() < f64::EPSILON);

        assert_eq!(pools[1].risk, RiskLevel::High);
        assert!(pools[1].rewards.is_empty());
        assert!(pools.iter().all(|p| p.protocol == "aave"));
    }

    #[tokio::test]
    async fn test_empty_pool_scores_by_formula() {
        let mock = Arc::new(MockTransport::new().json("yields.test", json!({"data": [{}]})));

        let pools = adapter(&mock).opportunities("aave").await.unwrap();
        assert_eq!(pools.len(), 1);
        // tvl 0 is the only contribution: +2
        assert_eq!(pools[0].risk, RiskLevel::Medium);
        assert!(pools[0].apy.abs() < f64::EPSILON);
        assert!(pools[0].pool.is_empty());
    }

    #[tokio::test]
    async fn test_other_projects_dropped() {
        let mock = Arc::new(MockTransport::new().json(
            "yields.test",
            json!({"data": [
                {"pool": "mine", "project": "aave", "apy": 3.0, "tvlUsd": 2e7},
                {"pool": "theirs", "project": "compound", "apy": 9.0, "tvlUsd": 2e7}
            ]}),
        ));

        let pools = adapter(&mock).opportunities("aave").await.unwrap();
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].pool, "mine");
    }

    #[tokio::test]
    async fn test_missing_data_is_empty() {
        let mock = Arc::new(MockTransport::new().json("yields.test", json!({"status": "ok"})));
        assert!(adapter(&mock).opportunities("aave").await.unwrap().is_empty());
    }
}
