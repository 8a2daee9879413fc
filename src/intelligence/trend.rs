//! Historical TVL and volume trends

use serde_json::Value;

use super::{SourceClient, endpoint, number};
use crate::config::SourcesConfig;
use crate::metrics::{dominance, growth_score, series_trend, volatility, volume_trend};
use crate::{Result, TrendAnalysis, TrendMetrics};

/// Reads the TVL history and DEX volume summary of a protocol
pub struct TrendAdapter {
    client: SourceClient,
    llama_url: String,
}

impl TrendAdapter {
    /// Create the adapter
    pub fn new(client: SourceClient, sources: &SourcesConfig) -> Self {
        Self {
            client,
            llama_url: sources.llama_url.clone(),
        }
    }

    /// Trend, dominance, volatility and growth.
    ///
    /// A missing or short TVL series yields zeros and `stable` rather than
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns the first upstream failure unchanged.
    pub async fn analyze(&self, protocol: &str) -> Result<TrendAnalysis> {
        let tvl_url = endpoint(&self.llama_url, &format!("protocol/{protocol}"));
        let volume_url = endpoint(&self.llama_url, &format!("summary/dexs/{protocol}"));

        let (history, volume) = tokio::try_join!(
            self.client.get("tvl", &tvl_url),
            self.client.get("volume", &volume_url),
        )?;

        let series = tvl_series(&history["tvl"]);
        let tvl = series_trend(&series);
        let volume = volume_trend(
            number(&volume["total24h"]),
            number(&volume["total7d"]),
            number(&volume["total30d"]),
        );

        let metrics = TrendMetrics {
            dominance: dominance(tvl.current, number(&history["chainTvls"]["total"])),
            volatility: volatility(&series),
            growth: growth_score(tvl.change_30d, volume.change_30d),
        };

        Ok(TrendAnalysis {
            protocol: protocol.to_string(),
            tvl,
            volume,
            metrics,
        })
    }
}

/// Daily TVL samples, oldest first
fn tvl_series(value: &Value) -> Vec<f64> {
    value
        .as_array()
        .map(|samples| {
            samples
                .iter()
                .map(|s| number(&s["totalLiquidityUSD"]))
                .collect()
        })
        .unwrap_or_default()
}
