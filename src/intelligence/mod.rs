//! Market intelligence sources
//!
//! Five independent adapters normalize their upstream's schema into the
//! records of [`insight_core`]. All of them reach the network through a
//! [`SourceClient`], which puts every attempt behind the shared
//! [`AdmissionController`](crate::failsafe::AdmissionController).
//! The [`Aggregator`] fans the adapters out and merges their results.
//!
//! DEX volume, chain TVL and token prices are standalone market reads
//! behind the same controller; they are not part of the composite.

mod aggregator;
mod chains;
mod client;
mod dex;
mod governance;
#[cfg(test)]
pub(crate) mod mock;
mod onchain;
mod prices;
mod risk;
mod sentiment;
mod trend;
mod yields;

pub use aggregator::{Aggregator, render_summary};
pub use chains::ChainTvlAdapter;
pub use client::SourceClient;
pub use dex::DexAdapter;
pub use governance::{
    GovernanceAdapter, GovernanceProvider, Outcome, SnapshotProvider, TallyProvider,
};
pub use onchain::{
    CheckedFigure, FigureCheck, OnchainMetricsFetcher, StatedFigure, extract_stated_figures,
};
pub use prices::PriceAdapter;
pub use risk::RiskAdapter;
pub use sentiment::SentimentAdapter;
pub use trend::TrendAdapter;
pub use yields::YieldAdapter;

use serde_json::Value;

/// Numeric field with the upstream's "absent means zero" convention.
///
/// Numbers and numeric strings are accepted; anything else reads as 0.
pub(crate) fn number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// String field, empty when absent
pub(crate) fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Current TVL from either a plain number or a historical series
pub(crate) fn current_tvl(value: &Value) -> f64 {
    match value {
        Value::Array(series) => series
            .last()
            .map_or(0.0, |sample| number(&sample["totalLiquidityUSD"])),
        other => number(other),
    }
}

/// Join a configured base URL and a path
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_defaults() {
        assert!((number(&json!(12.5)) - 12.5).abs() < f64::EPSILON);
        assert!((number(&json!("42")) - 42.0).abs() < f64::EPSILON);
        assert!(number(&json!(null)).abs() < f64::EPSILON);
        assert!(number(&json!("n/a")).abs() < f64::EPSILON);
        assert!(number(&json!({"a": 1})).abs() < f64::EPSILON);
    }

    #[test]
    fn test_text() {
        assert_eq!(text(&json!("0xabc")), "0xabc");
        assert_eq!(text(&json!(7)), "7");
        assert_eq!(text(&json!(null)), "");
    }

    #[test]
    fn test_endpoint_join() {
        assert_eq!(
            endpoint("https://api.llama.fi/", "/protocol/aave"),
            "https://api.llama.fi/protocol/aave"
        );
        assert_eq!(
            endpoint("https://api.llama.fi", "tvl/aave"),
            "https://api.llama.fi/tvl/aave"
        );
    }
}
