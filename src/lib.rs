//! DeFi Insight Library
//!
//! Rate-limited, fallback-aware aggregation of DeFi protocol data.
//!
//! # Features
//!
//! - **Admission control**: per-domain sliding-window budgets shared by all sources
//! - **429 handling**: bounded retries honouring `retry-after`
//! - **Five sources**: risk, sentiment, governance (ranked fallback), yields, trends
//! - **Composite insight**: fail-fast fan-out merged into one report with a summary
//! - **Metrics cache**: TTL-bounded on-chain figures for cross-checking stated numbers
//! - **Market reads**: DEX volume, chain TVL, multi-protocol TVL and token prices
//!
//! The data model and pure derivations live in [`insight_core`] and are
//! re-exported here.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod failsafe;
pub mod intelligence;
pub mod transport;

pub use error::{Error, Result};
pub use insight_core::metrics;
pub use insight_core::{
    ChainTvl, CompositeInsight, DexPair, DexVolume, GovernanceProposal, GovernanceSummary,
    MarketSentimentRecord, OnchainMetrics, PoolHighlight, ProposalActivity, ProtocolRiskRecord,
    RiskDetails, RiskFactors, RiskLevel, RiskSummary, SentimentSummary, SeriesTrend, SocialMetrics,
    Trend, TrendAnalysis, TrendMetrics, TrendSummary, TvlPoint, Votes, YieldOpportunity,
    YieldRequirements, YieldSummary,
};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
///
/// `RUST_LOG` overrides `level` when set.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = match format {
        Some("json") => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        _ => subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    installed.map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {e}")))
}
