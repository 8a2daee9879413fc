//! DeFi insight core library
//!
//! Protocol records shared by every source adapter, plus the pure
//! derivations computed from them (risk tiering, pool scoring, trend
//! classification, volatility, growth). Nothing here performs I/O.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod metrics;
pub mod models;

pub use models::{
    ChainTvl, CompositeInsight, DexPair, DexVolume, GovernanceProposal, GovernanceSummary,
    MarketSentimentRecord, OnchainMetrics, PoolHighlight, ProposalActivity, ProtocolRiskRecord,
    RiskDetails, RiskFactors, RiskLevel, RiskSummary, SentimentSummary, SeriesTrend, SocialMetrics,
    Trend, TrendAnalysis, TrendMetrics, TrendSummary, TvlPoint, Votes, YieldOpportunity,
    YieldRequirements, YieldSummary,
};
