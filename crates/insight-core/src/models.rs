//! Protocol insight records

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics;

/// Risk tier used for every factor and for the overall verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Low risk
    Low,
    /// Medium risk
    Medium,
    /// High risk
    High,
}

impl RiskLevel {
    /// Numeric weight used when averaging tiers (low=1, medium=2, high=3).
    #[must_use]
    pub fn weight(self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    /// Lowercase label
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-factor risk tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactors {
    /// Tier derived from TVL size
    pub tvl_risk: RiskLevel,
    /// Tier derived from 24h TVL change (never `Low`)
    pub volatility_risk: RiskLevel,
    /// Tier derived from the safety score
    pub security_risk: RiskLevel,
}

/// Safety and size assessment of a protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolRiskRecord {
    /// Protocol slug as queried
    pub protocol: String,
    /// Safety score (0-100)
    pub security_score: f64,
    /// Total value locked in USD
    pub tvl_usd: f64,
    /// 24h TVL change in percent
    pub volatility_24h: f64,
    /// Overall verdict, a pure function of `risk_factors`
    pub risk_level: RiskLevel,
    /// Individual factor tiers
    pub risk_factors: RiskFactors,
}

impl ProtocolRiskRecord {
    /// Build a record from raw upstream figures.
    ///
    /// Tiers and the overall level are derived here and nowhere else, so a
    /// record can never carry a verdict inconsistent with its inputs.
    #[must_use]
    pub fn assess(
        protocol: impl Into<String>,
        security_score: f64,
        tvl_usd: f64,
        volatility_24h: f64,
    ) -> Self {
        let risk_factors = RiskFactors {
            tvl_risk: metrics::tvl_risk(tvl_usd),
            volatility_risk: metrics::volatility_risk(volatility_24h),
            security_risk: metrics::security_risk(security_score),
        };

        Self {
            protocol: protocol.into(),
            security_score,
            tvl_usd,
            volatility_24h,
            risk_level: metrics::overall_risk(&risk_factors),
            risk_factors,
        }
    }
}

/// Social and developer activity snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSentimentRecord {
    /// Protocol slug as queried
    pub protocol: String,
    /// Mention volume
    pub social_volume: f64,
    /// Sentiment in [-1, 1]
    pub sentiment_score: f64,
    /// Same upstream mention count as `social_volume`
    pub twitter_mentions: f64,
    /// Commit count
    pub github_activity: f64,
    /// Contributor count
    pub developer_activity: f64,
}

/// Vote tallies of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Votes {
    /// Votes in favour
    #[serde(rename = "for")]
    pub for_votes: f64,
    /// Votes against (0 when the provider does not expose them)
    pub against: f64,
}

/// A governance proposal from a single provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceProposal {
    /// Provider-specific identifier
    pub id: String,
    /// Title
    pub title: String,
    /// Body text
    pub description: String,
    /// Lowercased status (`active`, `closed`, ...)
    pub status: String,
    /// Vote tallies
    pub votes: Votes,
    /// Quorum required
    pub quorum: f64,
    /// Voting deadline
    pub deadline: DateTime<Utc>,
}

impl GovernanceProposal {
    /// Whether voting is still open
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

/// Deposit requirements of a pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct YieldRequirements {
    /// Minimum deposit
    pub min_deposit: f64,
    /// Lockup period
    pub lockup_period: f64,
}

/// A yield pool offered by the protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldOpportunity {
    /// Protocol slug as queried
    pub protocol: String,
    /// Pool identifier
    pub pool: String,
    /// Annual percentage yield
    pub apy: f64,
    /// Pool TVL in USD
    pub tvl: f64,
    /// Point-scored risk tier
    pub risk: RiskLevel,
    /// Reward token symbols, in upstream order
    pub rewards: Vec<String>,
    /// Deposit requirements
    pub requirements: YieldRequirements,
}

/// Direction of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    /// Weighted change >= +5%
    Up,
    /// Weighted change <= -5%
    Down,
    /// Weighted change within ±5%
    Stable,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Stable => "stable",
        })
    }
}

/// Current value and relative changes of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesTrend {
    /// Latest value
    pub current: f64,
    /// Percent change over 7 days
    pub change_7d: f64,
    /// Percent change over 30 days
    pub change_30d: f64,
    /// Classification of the weighted change
    pub trend: Trend,
}

impl SeriesTrend {
    /// A flat, empty series.
    #[must_use]
    pub fn flat() -> Self {
        Self {
            current: 0.0,
            change_7d: 0.0,
            change_30d: 0.0,
            trend: Trend::Stable,
        }
    }
}

/// Cross-series metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendMetrics {
    /// Share of total chain TVL in percent
    pub dominance: f64,
    /// Std deviation of daily TVL returns, in percent
    pub volatility: f64,
    /// Weighted 30d growth score
    pub growth: f64,
}

/// Historical TVL and volume analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    /// Protocol slug as queried
    pub protocol: String,
    /// TVL trend
    pub tvl: SeriesTrend,
    /// Volume trend
    pub volume: SeriesTrend,
    /// Derived metrics
    pub metrics: TrendMetrics,
}

/// Current on-chain figures used to cross-check stated numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnchainMetrics {
    /// Protocol slug as queried
    pub protocol: String,
    /// Current TVL in USD
    pub tvl: f64,
    /// 24h DEX volume in USD
    pub volume_24h: f64,
    /// When the figures were fetched
    pub fetched_at: DateTime<Utc>,
}

/// A traded pair on a DEX.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DexPair {
    /// Pair name, e.g. `WETH/USDC`
    pub pair: String,
    /// 24h volume in USD
    pub volume_24h: f64,
    /// 24h price change in percent
    pub price_change_24h: f64,
}

/// Trading volume overview of a DEX.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DexVolume {
    /// DEX slug as queried
    pub dex: String,
    /// 24h volume in USD
    pub daily_volume: f64,
    /// All-time volume in USD
    pub total_volume: f64,
    /// 24h volume change in percent
    pub volume_change_24h: f64,
    /// Most traded pairs, at most five
    pub top_pairs: Vec<DexPair>,
}

/// Current TVL of one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainTvl {
    /// Chain name
    pub name: String,
    /// TVL in USD
    pub tvl: f64,
    /// Native token symbol
    pub token_symbol: Option<String>,
    /// CoinGecko id of the native token
    pub gecko_id: Option<String>,
    /// CoinMarketCap id of the native token
    pub cmc_id: Option<String>,
}

/// One sample of a historical TVL series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TvlPoint {
    /// Unix timestamp in seconds
    pub date: i64,
    /// TVL in USD
    pub tvl: f64,
}

// ============================================================================
// Composite report
// ============================================================================

/// Merged report for one protocol. Built once, never partially populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeInsight {
    /// Protocol slug as queried
    pub protocol: String,
    /// Risk summary
    pub risk: RiskSummary,
    /// Sentiment summary
    pub sentiment: SentimentSummary,
    /// Governance summary
    pub governance: GovernanceSummary,
    /// Yield summary
    #[serde(rename = "yield")]
    pub yields: YieldSummary,
    /// Trend data, copied through
    pub trends: TrendSummary,
    /// Natural-language summary
    pub summary: String,
    /// When the report was assembled
    pub generated_at: DateTime<Utc>,
}

/// Risk portion of the composite report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    /// Overall verdict
    pub overall: RiskLevel,
    /// Inputs behind the verdict
    pub details: RiskDetails,
}

/// Inputs behind a risk verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDetails {
    /// Safety score
    pub security_score: f64,
    /// TVL in USD
    pub tvl_usd: f64,
    /// 24h TVL change
    pub volatility_24h: f64,
    /// Factor tiers
    pub risk_factors: RiskFactors,
}

/// Sentiment portion of the composite report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    /// Sentiment score
    pub score: f64,
    /// Activity counters
    pub social_metrics: SocialMetrics,
}

/// Activity counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialMetrics {
    /// Social volume
    pub volume: f64,
    /// Twitter mentions
    pub twitter: f64,
    /// Commit count
    pub github: f64,
    /// Contributor count
    pub developers: f64,
}

/// Governance portion of the composite report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceSummary {
    /// Proposals with status `active`
    pub active_proposals: usize,
    /// All fetched proposals, in provider order
    pub recent_activity: Vec<ProposalActivity>,
}

/// Condensed proposal view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalActivity {
    /// Identifier
    pub id: String,
    /// Title
    pub title: String,
    /// Status
    pub status: String,
    /// Deadline
    pub deadline: DateTime<Utc>,
}

/// Yield portion of the composite report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldSummary {
    /// Top three pools by APY, descending
    pub best_opportunities: Vec<PoolHighlight>,
    /// Mean APY of all pools (0 when none)
    pub average_apy: f64,
}

/// Condensed pool view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolHighlight {
    /// Pool identifier
    pub pool: String,
    /// APY
    pub apy: f64,
    /// Pool TVL
    pub tvl: f64,
    /// Risk tier
    pub risk: RiskLevel,
}

/// Trend portion of the composite report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    /// TVL trend
    pub tvl: SeriesTrend,
    /// Volume trend
    pub volume: SeriesTrend,
    /// Derived metrics
    pub metrics: TrendMetrics,
}
