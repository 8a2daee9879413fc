//! Protocol risk from a safety score and TVL movement

use tracing::debug;

use super::{SourceClient, current_tvl, endpoint, number};
use crate::config::SourcesConfig;
use crate::{ProtocolRiskRecord, Result};

/// Combines a safety-score provider with the TVL provider
pub struct RiskAdapter {
    client: SourceClient,
    safety_url: String,
    llama_url: String,
}

impl RiskAdapter {
    /// Create the adapter
    pub fn new(client: SourceClient, sources: &SourcesConfig) -> Self {
        Self {
            client,
            safety_url: sources.safety_url.clone(),
            llama_url: sources.llama_url.clone(),
        }
    }

    /// Fetch both inputs concurrently and tier them.
    ///
    /// Absent fields read as 0, which lands in the high-risk tiers.
    ///
    /// # Errors
    ///
    /// Returns the first upstream failure unchanged.
    pub async fn assess(&self, protocol: &str) -> Result<ProtocolRiskRecord> {
        let safety_url = endpoint(&self.safety_url, &format!("projects/{protocol}"));
        let tvl_url = endpoint(&self.llama_url, &format!("protocol/{protocol}"));

        let (safety, tvl) = tokio::try_join!(
            self.client.get("safety", &safety_url),
            self.client.get("tvl", &tvl_url),
        )?;

        let record = ProtocolRiskRecord::assess(
            protocol,
            number(&safety["score"]),
            current_tvl(&tvl["tvl"]),
            number(&tvl["tvlChange24h"]),
        );
        debug!(
            protocol = protocol,
            risk = %record.risk_level,
            "Risk assessed"
        );
        Ok(record)
    }
}
