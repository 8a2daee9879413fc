//! Cached on-chain metrics and cross-checks of stated figures
//!
//! Text that quotes a protocol's size ("$1.5B locked", "over 200M TVL") is
//! checked against the TVL provider. Figures are read from text with a
//! single pattern: an optional `$`, a number with optional thousands
//! separators, and an optional `B`/`M`/`K` scale. A bare number without
//! either a `$` or a scale is not treated as a figure.

use std::sync::{Arc, OnceLock};

use chrono::Utc;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use super::{SourceClient, endpoint, number};
use crate::cache::MetricsCache;
use crate::config::SourcesConfig;
use crate::{OnchainMetrics, Result};

/// A monetary figure found in text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatedFigure {
    /// Matched text
    pub raw: String,
    /// Value in USD
    pub value: f64,
}

/// A stated figure compared with on-chain TVL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckedFigure {
    /// The figure as stated
    #[serde(flatten)]
    pub figure: StatedFigure,
    /// `|stated - tvl| / tvl`; absent when on-chain TVL is 0
    pub deviation: Option<f64>,
    /// Whether the deviation is within tolerance
    pub within_tolerance: bool,
}

/// Outcome of checking a text against on-chain TVL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FigureCheck {
    /// Protocol checked
    pub protocol: String,
    /// On-chain TVL used as reference
    pub onchain_tvl: f64,
    /// Relative tolerance applied
    pub tolerance: f64,
    /// Every figure found, in order of appearance
    pub figures: Vec<CheckedFigure>,
    /// True when every figure is within tolerance (vacuously for none)
    pub verified: bool,
}

fn figure_pattern() -> &'static Regex {
    static FIGURE_RE: OnceLock<Regex> = OnceLock::new();
    FIGURE_RE.get_or_init(|| {
        Regex::new(r"(?i)(\$)?\s?(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)\s?([bmk])?\b")
            .expect("static regex")
    })
}

/// Monetary figures written like `$1.5B`, `200M`, `$750K` or `$1,200`.
pub fn extract_stated_figures(text: &str) -> Vec<StatedFigure> {
    figure_pattern()
        .captures_iter(text)
        .filter_map(|caps| {
            let dollar = caps.get(1).is_some();
            let scale = caps.get(3).map(|m| match m.as_str() {
                "b" | "B" => 1e9,
                "m" | "M" => 1e6,
                _ => 1e3,
            });
            if !dollar && scale.is_none() {
                return None;
            }

            let digits = caps.get(2)?.as_str().replace(',', "");
            let base: f64 = digits.parse().ok()?;
            Some(StatedFigure {
                raw: caps.get(0)?.as_str().trim().to_string(),
                value: base * scale.unwrap_or(1.0),
            })
        })
        .collect()
}

/// TVL and 24h volume, served from a [`MetricsCache`] while fresh
pub struct OnchainMetricsFetcher {
    client: SourceClient,
    llama_url: String,
    cache: Arc<MetricsCache>,
    tolerance: f64,
}

impl OnchainMetricsFetcher {
    /// Create a fetcher over `cache` comparing figures with `tolerance`
    pub fn new(
        client: SourceClient,
        sources: &SourcesConfig,
        cache: Arc<MetricsCache>,
        tolerance: f64,
    ) -> Self {
        Self {
            client,
            llama_url: sources.llama_url.clone(),
            cache,
            tolerance,
        }
    }

    /// The backing cache
    pub fn cache(&self) -> &MetricsCache {
        &self.cache
    }

    /// Current metrics of `protocol`. Fetched and cached on a miss.
    ///
    /// # Errors
    ///
    /// Returns the first upstream failure unchanged; nothing is cached then.
    pub async fn metrics(&self, protocol: &str) -> Result<OnchainMetrics> {
        if let Some(hit) = self.cache.get(protocol) {
            debug!(protocol = protocol, "On-chain metrics served from cache");
            return Ok(hit.value);
        }

        let tvl_url = endpoint(&self.llama_url, &format!("tvl/{protocol}"));
        let volume_url = endpoint(&self.llama_url, &format!("summary/dexs/{protocol}"));
        let (tvl, volume) = tokio::try_join!(
            self.client.get("tvl", &tvl_url),
            self.client.get("volume", &volume_url),
        )?;

        let metrics = OnchainMetrics {
            protocol: protocol.to_string(),
            tvl: number(&tvl),
            volume_24h: number(&volume["total24h"]),
            fetched_at: Utc::now(),
        };
        self.cache.store(protocol, metrics.clone());
        Ok(metrics)
    }

    /// Compare every figure stated in `text` with the on-chain TVL.
    ///
    /// # Errors
    ///
    /// Propagates failures of [`metrics`](Self::metrics). Text without
    /// figures does not touch the network.
    pub async fn verify_stated_figures(&self, text: &str, protocol: &str) -> Result<FigureCheck> {
        let stated = extract_stated_figures(text);
        if stated.is_empty() {
            return Ok(FigureCheck {
                protocol: protocol.to_string(),
                onchain_tvl: 0.0,
                tolerance: self.tolerance,
                figures: Vec::new(),
                verified: true,
            });
        }

        let onchain_tvl = self.metrics(protocol).await?.tvl;
        let figures: Vec<CheckedFigure> = stated
            .into_iter()
            .map(|figure| {
                let deviation =
                    (onchain_tvl > 0.0).then(|| (figure.value - onchain_tvl).abs() / onchain_tvl);
                CheckedFigure {
                    within_tolerance: deviation.is_some_and(|d| d <= self.tolerance),
                    deviation,
                    figure,
                }
            })
            .collect();
        let verified = figures.iter().all(|f| f.within_tolerance);

        info!(
            protocol = protocol,
            figures = figures.len(),
            verified = verified,
            "Stated figures checked"
        );

        Ok(FigureCheck {
            protocol: protocol.to_string(),
            onchain_tvl,
            tolerance: self.tolerance,
            figures,
            verified,
        })
    }
}
