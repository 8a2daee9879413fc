//! Composite insight over all five sources

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::{
    GovernanceAdapter, OnchainMetricsFetcher, RiskAdapter, SentimentAdapter, SourceClient,
    TrendAdapter, YieldAdapter,
};
use crate::cache::MetricsCache;
use crate::config::Config;
use crate::metrics::{average_apy, best_apy, top_by_apy};
use crate::{
    CompositeInsight, GovernanceProposal, GovernanceSummary, MarketSentimentRecord, PoolHighlight,
    ProposalActivity, ProtocolRiskRecord, Result, RiskDetails, RiskSummary, SentimentSummary,
    SocialMetrics, TrendAnalysis, TrendSummary, YieldOpportunity, YieldSummary,
};

/// Number of pools highlighted in a composite
const BEST_OPPORTUNITIES: usize = 3;

/// Owns the five source adapters and merges their results
pub struct Aggregator {
    risk: RiskAdapter,
    sentiment: SentimentAdapter,
    governance: GovernanceAdapter,
    yields: YieldAdapter,
    trends: TrendAdapter,
    onchain: OnchainMetricsFetcher,
}

impl Aggregator {
    /// Wire every adapter to one transport, controller and cache
    pub fn new(client: &SourceClient, config: &Config, cache: Arc<MetricsCache>) -> Self {
        let sources = &config.sources;
        Self {
            risk: RiskAdapter::new(client.clone(), sources),
            sentiment: SentimentAdapter::new(client.clone(), sources),
            governance: GovernanceAdapter::new(
                client.clone(),
                sources,
                config.governance.proposal_limit,
            ),
            yields: YieldAdapter::new(client.clone(), sources),
            trends: TrendAdapter::new(client.clone(), sources),
            onchain: OnchainMetricsFetcher::new(
                client.clone(),
                sources,
                cache,
                config.claims.tolerance,
            ),
        }
    }

    /// Build the production stack from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = Arc::new(MetricsCache::new(config.cache.ttl));
        Ok(Self::new(&SourceClient::from_config(config)?, config, cache))
    }

    /// On-chain metrics and stated-figure checks
    pub fn onchain(&self) -> &OnchainMetricsFetcher {
        &self.onchain
    }

    /// Query all five sources concurrently and merge the results.
    ///
    /// Either every source succeeds and a full composite is returned, or
    /// the first failure is returned unchanged. Sibling requests already in
    /// flight are dropped with the call.
    ///
    /// # Errors
    ///
    /// The first adapter failure.
    pub async fn get_comprehensive_analysis(&self, protocol: &str) -> Result<CompositeInsight> {
        let (risk, sentiment, proposals, pools, trends) = tokio::try_join!(
            self.risk.assess(protocol),
            self.sentiment.sentiment(protocol),
            self.governance.proposals(protocol),
            self.yields.opportunities(protocol),
            self.trends.analyze(protocol),
        )
        .inspect_err(|e| warn!(protocol = protocol, error = %e, "Aggregation failed"))?;

        let insight = compose(protocol, risk, &sentiment, &proposals, &pools, trends);
        info!(
            protocol = protocol,
            risk = %insight.risk.overall,
            active_proposals = insight.governance.active_proposals,
            pools = pools.len(),
            "Composite insight generated"
        );
        Ok(insight)
    }
}

fn compose(
    protocol: &str,
    risk: ProtocolRiskRecord,
    sentiment: &MarketSentimentRecord,
    proposals: &[GovernanceProposal],
    pools: &[YieldOpportunity],
    trends: TrendAnalysis,
) -> CompositeInsight {
    let active_proposals = proposals.iter().filter(|p| p.is_active()).count();

    let mut insight = CompositeInsight {
        protocol: protocol.to_string(),
        risk: RiskSummary {
            overall: risk.risk_level,
            details: RiskDetails {
                security_score: risk.security_score,
                tvl_usd: risk.tvl_usd,
                volatility_24h: risk.volatility_24h,
                risk_factors: risk.risk_factors,
            },
        },
        sentiment: SentimentSummary {
            score: sentiment.sentiment_score,
            social_metrics: SocialMetrics {
                volume: sentiment.social_volume,
                twitter: sentiment.twitter_mentions,
                github: sentiment.github_activity,
                developers: sentiment.developer_activity,
            },
        },
        governance: GovernanceSummary {
            active_proposals,
            recent_activity: proposals
                .iter()
                .map(|p| ProposalActivity {
                    id: p.id.clone(),
                    title: p.title.clone(),
                    status: p.status.clone(),
                    deadline: p.deadline,
                })
                .collect(),
        },
        yields: YieldSummary {
            best_opportunities: top_by_apy(pools, BEST_OPPORTUNITIES)
                .into_iter()
                .map(|p| PoolHighlight {
                    pool: p.pool.clone(),
                    apy: p.apy,
                    tvl: p.tvl,
                    risk: p.risk,
                })
                .collect(),
            average_apy: average_apy(pools),
        },
        trends: TrendSummary {
            tvl: trends.tvl,
            volume: trends.volume,
            metrics: trends.metrics,
        },
        summary: String::new(),
        generated_at: Utc::now(),
    };
    insight.summary = render_summary(&insight, best_apy(pools));
    insight
}

/// One-paragraph description of a composite
pub fn render_summary(insight: &CompositeInsight, best_apy: f64) -> String {
    let polarity = if insight.sentiment.score > 0.0 {
        "positive"
    } else {
        "negative"
    };

    format!(
        "{} shows {} risk with {} TVL trend. Community sentiment is {} with {} active \
         governance proposals. Best yield opportunity offers {:.2}% APY.",
        insight.protocol,
        insight.risk.overall.as_str().to_uppercase(),
        insight.trends.tvl.trend,
        polarity,
        insight.governance.active_proposals,
        best_apy,
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use super::*;
    use crate::intelligence::mock::{self, MockTransport, Reply};
    use crate::{RiskLevel, Trend};

    fn config() -> Config {
        Config {
            sources: mock::sources(),
            ..Config::default()
        }
    }

    fn aggregator(mock: &Arc<MockTransport>) -> Aggregator {
        Aggregator::new(
            &mock::client(mock),
            &config(),
            Arc::new(MetricsCache::default()),
        )
    }

    fn tvl_history() -> Value {
        let samples: Vec<Value> = (0..31)
            .map(|day| json!({"date": day, "totalLiquidityUSD": 1.0e9 + f64::from(day) * 2.0e7}))
            .collect();
        json!({"tvl": samples, "tvlChange24h": 1.2, "chainTvls": {"total": 5.0e10}})
    }

    fn healthy() -> MockTransport {
        MockTransport::new()
            .json("safety.test/v1/projects/aave", json!({"score": 92}))
            .json("llama.test/protocol/aave", tvl_history())
            .json(
                "llama.test/summary/dexs/aave",
                json!({"total24h": 1.0e8, "total7d": 7.0e8, "total30d": 3.0e9}),
            )
            .json(
                "santiment.test",
                json!({"data": {
                    "socialVolume": {"mentionsCount": 800, "sentiment": 0.4},
                    "githubActivity": {"commits": 60, "contributors": 12}
                }}),
            )
            .json(
                "snapshot.test",
                json!({"data": {"proposals": [
                    {"id": "p1", "title": "A", "state": "active", "end": 1_700_000_000},
                    {"id": "p2", "title": "B", "state": "closed", "end": 1_690_000_000},
                    {"id": "p3", "title": "C", "state": "ACTIVE", "end": 1_710_000_000}
                ]}}),
            )
            .json(
                "yields.test",
                json!({"data": [
                    {"pool": "usdc", "project": "aave", "apy": 15.5, "tvlUsd": 5e8},
                    {"pool": "eth", "project": "aave", "apy": 8.2, "tvlUsd": 9e8},
                    {"pool": "gho", "project": "aave", "apy": 25.8, "tvlUsd": 4e7},
                    {"pool": "dai", "project": "aave", "apy": 2.5, "tvlUsd": 2e8}
                ]}),
            )
    }

    #[tokio::test]
    async fn test_comprehensive_analysis() {
        let mock = Arc::new(healthy());
        let insight = aggregator(&mock)
            .get_comprehensive_analysis("aave")
            .await
            .unwrap();

        assert_eq!(insight.protocol, "aave");
        assert_eq!(insight.risk.overall, RiskLevel::Low);
        assert!((insight.sentiment.score - 0.4).abs() < f64::EPSILON);
        assert!((insight.sentiment.social_metrics.twitter - 800.0).abs() < f64::EPSILON);

        assert_eq!(insight.governance.active_proposals, 2);
        assert_eq!(insight.governance.recent_activity.len(), 3);

        let best: Vec<&str> = insight
            .yields
            .best_opportunities
            .iter()
            .map(|p| p.pool.as_str())
            .collect();
        assert_eq!(best, vec!["gho", "usdc", "eth"]);
        assert!((insight.yields.average_apy - 13.0).abs() < 1e-9);

        assert_eq!(insight.trends.tvl.trend, Trend::Up);
        assert_eq!(
            insight.summary,
            "aave shows LOW risk with up TVL trend. Community sentiment is positive with 2 \
             active governance proposals. Best yield opportunity offers 25.80% APY."
        );
    }

    #[tokio::test]
    async fn test_yield_failure_aborts_composite() {
        let mock = Arc::new(
            MockTransport::new()
                .json("safety.test", json!({"score": 92}))
                .json("llama.test/protocol/aave", tvl_history())
                .json("llama.test/summary/dexs/aave", json!({}))
                .json("santiment.test", json!({"data": {}}))
                .json("snapshot.test", json!({"data": {"proposals": []}}))
                .json("tally.test", json!({"data": {"proposals": {"nodes": []}}}))
                .route("yields.test", Reply::Status(500)),
        );

        let err = aggregator(&mock)
            .get_comprehensive_analysis("aave")
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(err.to_string().contains("yields.test"));
    }

    fn bare(score: f64, best_apy: f64, active: usize) -> String {
        let insight = CompositeInsight {
            protocol: "curve".to_string(),
            risk: RiskSummary {
                overall: RiskLevel::Medium,
                details: RiskDetails {
                    security_score: 0.0,
                    tvl_usd: 0.0,
                    volatility_24h: 0.0,
                    risk_factors: crate::RiskFactors {
                        tvl_risk: RiskLevel::Medium,
                        volatility_risk: RiskLevel::Medium,
                        security_risk: RiskLevel::Medium,
                    },
                },
            },
            sentiment: SentimentSummary {
                score,
                social_metrics: SocialMetrics {
                    volume: 0.0,
                    twitter: 0.0,
                    github: 0.0,
                    developers: 0.0,
                },
            },
            governance: GovernanceSummary {
                active_proposals: active,
                recent_activity: Vec::new(),
            },
            yields: YieldSummary {
                best_opportunities: Vec::new(),
                average_apy: 0.0,
            },
            trends: TrendSummary {
                tvl: crate::SeriesTrend::flat(),
                volume: crate::SeriesTrend::flat(),
                metrics: crate::TrendMetrics {
                    dominance: 0.0,
                    volatility: 0.0,
                    growth: 0.0,
                },
            },
            summary: String::new(),
            generated_at: Utc::now(),
        };
        render_summary(&insight, best_apy)
    }

    #[test]
    fn test_summary_zero_sentiment_is_negative() {
        assert_eq!(
            bare(0.0, 0.0, 0),
            "curve shows MEDIUM risk with stable TVL trend. Community sentiment is negative \
             with 0 active governance proposals. Best yield opportunity offers 0.00% APY."
        );
    }

    #[test]
    fn test_summary_rounds_apy() {
        assert!(bare(0.1, 7.456, 1).ends_with("offers 7.46% APY."));
    }
}
