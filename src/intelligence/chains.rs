//! Chain-level TVL and multi-protocol TVL

use std::collections::BTreeMap;

use futures::future::try_join_all;
use serde_json::Value;
use tracing::debug;

use super::{SourceClient, current_tvl, endpoint, number, text};
use crate::config::SourcesConfig;
use crate::{ChainTvl, Error, Result, TvlPoint};

/// Reads chain and protocol TVL from the TVL provider
pub struct ChainTvlAdapter {
    client: SourceClient,
    llama_url: String,
}

impl ChainTvlAdapter {
    /// Create the adapter
    pub fn new(client: SourceClient, sources: &SourcesConfig) -> Self {
        Self {
            client,
            llama_url: sources.llama_url.clone(),
        }
    }

    /// Current TVL of every chain, keyed by chain name.
    ///
    /// # Errors
    ///
    /// Upstream failures, and [`Error::Schema`] when the response is not a
    /// list of chains.
    pub async fn all_chains(&self) -> Result<BTreeMap<String, ChainTvl>> {
        let url = endpoint(&self.llama_url, "v2/chains");
        let response = self.client.get("chains", &url).await?;

        let chains = response
            .as_array()
            .ok_or_else(|| Error::schema("chains", "expected a list of chains"))?;

        let chains: BTreeMap<String, ChainTvl> = chains
            .iter()
            .map(|c| {
                let chain = ChainTvl {
                    name: text(&c["name"]),
                    tvl: number(&c["tvl"]),
                    token_symbol: optional_text(&c["tokenSymbol"]),
                    gecko_id: optional_text(&c["gecko_id"]),
                    cmc_id: optional_text(&c["cmcId"]),
                };
                (chain.name.clone(), chain)
            })
            .filter(|(name, _)| !name.is_empty())
            .collect();

        debug!(chains = chains.len(), "Chain TVL fetched");
        Ok(chains)
    }

    /// Daily TVL history of one chain, oldest first.
    ///
    /// # Errors
    ///
    /// Upstream failures, and [`Error::Schema`] when the response is not a
    /// series.
    pub async fn chain_history(&self, chain: &str) -> Result<Vec<TvlPoint>> {
        let url = endpoint(&self.llama_url, &format!("v2/historicalChainTvl/{chain}"));
        history(&self.client.get("chain history", &url).await?)
    }

    /// Daily TVL history summed over all chains, oldest first.
    ///
    /// # Errors
    ///
    /// Upstream failures, and [`Error::Schema`] when the response is not a
    /// series.
    pub async fn total_history(&self) -> Result<Vec<TvlPoint>> {
        let url = endpoint(&self.llama_url, "v2/historicalChainTvl");
        history(&self.client.get("chain history", &url).await?)
    }

    /// Current TVL of several protocols, fetched concurrently.
    ///
    /// Keys are the protocol names reported upstream, falling back to the
    /// queried slug.
    ///
    /// # Errors
    ///
    /// The first upstream failure; no partial map is returned.
    pub async fn protocols_tvl(&self, protocols: &[String]) -> Result<BTreeMap<String, f64>> {
        let fetches = protocols.iter().map(|protocol| async move {
            let url = endpoint(&self.llama_url, &format!("protocol/{protocol}"));
            let data = self.client.get("tvl", &url).await?;
            let name = match text(&data["name"]) {
                name if name.is_empty() => protocol.clone(),
                name => name,
            };
            Ok::<_, Error>((name, current_tvl(&data["tvl"])))
        });

        Ok(try_join_all(fetches).await?.into_iter().collect())
    }
}

fn history(response: &Value) -> Result<Vec<TvlPoint>> {
    let samples = response
        .as_array()
        .ok_or_else(|| Error::schema("chain history", "expected a TVL series"))?;

    Ok(samples
        .iter()
        .map(|s| TvlPoint {
            date: s["date"].as_i64().unwrap_or_default(),
            tvl: number(&s["tvl"]),
        })
        .collect())
}

fn optional_text(value: &Value) -> Option<String> {
    Some(text(value)).filter(|s| !s.is_empty())
}
