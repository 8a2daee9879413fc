//! Token spot prices

use std::collections::BTreeMap;

use super::{SourceClient, endpoint};
use crate::config::SourcesConfig;
use crate::Result;

/// Reads USD spot prices from the price provider
pub struct PriceAdapter {
    client: SourceClient,
    url: String,
}

impl PriceAdapter {
    /// Create the adapter
    pub fn new(client: SourceClient, sources: &SourcesConfig) -> Self {
        Self {
            client,
            url: sources.prices_url.clone(),
        }
    }

    /// USD price per token id, in one request.
    ///
    /// Ids the provider does not know are absent from the map rather than
    /// priced at 0.
    ///
    /// # Errors
    ///
    /// Returns the upstream failure unchanged.
    pub async fn prices(&self, tokens: &[String]) -> Result<BTreeMap<String, f64>> {
        if tokens.is_empty() {
            return Ok(BTreeMap::new());
        }

        let url = endpoint(
            &self.url,
            &format!("simple/price?ids={}&vs_currencies=usd", tokens.join(",")),
        );
        let response = self.client.get("prices", &url).await?;

        Ok(tokens
            .iter()
            .filter_map(|token| {
                response[token.as_str()]["usd"]
                    .as_f64()
                    .map(|usd| (token.clone(), usd))
            })
            .collect())
    }
}
