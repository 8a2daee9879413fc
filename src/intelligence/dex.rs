//! DEX trading volume

use tracing::debug;

use super::{SourceClient, endpoint, number, text};
use crate::config::SourcesConfig;
use crate::{DexPair, DexVolume, Result};

/// Pairs kept from the upstream listing
const TOP_PAIRS: usize = 5;

/// Reads the volume overview of a DEX from the TVL provider
pub struct DexAdapter {
    client: SourceClient,
    llama_url: String,
}

impl DexAdapter {
    /// Create the adapter
    pub fn new(client: SourceClient, sources: &SourcesConfig) -> Self {
        Self {
            client,
            llama_url: sources.llama_url.clone(),
        }
    }

    /// Daily and all-time volume plus the first five listed pairs.
    ///
    /// Absent figures read as 0; a missing pair list yields no pairs.
    ///
    /// # Errors
    ///
    /// Returns the upstream failure unchanged.
    pub async fn stats(&self, dex: &str) -> Result<DexVolume> {
        let url = endpoint(&self.llama_url, &format!("overview/dexs/{dex}"));
        let data = self.client.get("dex", &url).await?;

        let top_pairs: Vec<DexPair> = data["pairs"]
            .as_array()
            .map(|pairs| {
                pairs
                    .iter()
                    .take(TOP_PAIRS)
                    .map(|p| DexPair {
                        pair: text(&p["name"]),
                        volume_24h: number(&p["volume24h"]),
                        price_change_24h: number(&p["priceChange24h"]),
                    })
                    .collect()
            })
            .unwrap_or_default();

        debug!(dex = dex, pairs = top_pairs.len(), "DEX volume fetched");
        Ok(DexVolume {
            dex: dex.to_string(),
            daily_volume: number(&data["total24h"]),
            total_volume: number(&data["totalAllTime"]),
            volume_change_24h: number(&data["change24h"]),
            top_pairs,
        })
    }
}
