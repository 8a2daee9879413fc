//! Derived metric primitives
//!
//! Every function here is pure and total: empty or short inputs produce the
//! documented zero values rather than panicking or returning `NaN`.

use crate::models::{RiskFactors, RiskLevel, SeriesTrend, Trend, YieldOpportunity};

/// TVL above which size risk is low ($1B)
pub const TVL_LOW_RISK: f64 = 1_000_000_000.0;
/// TVL above which size risk is medium ($100M)
pub const TVL_MEDIUM_RISK: f64 = 100_000_000.0;
/// Absolute 24h change (percent) above which volatility risk is high
pub const VOLATILITY_HIGH_RISK: f64 = 20.0;
/// Safety score below which security risk is high
pub const SECURITY_HIGH_RISK: f64 = 70.0;
/// Safety score below which security risk is medium
pub const SECURITY_MEDIUM_RISK: f64 = 85.0;

/// Pool TVL threshold for the yield point system ($1M)
pub const POOL_TVL_THRESHOLD: f64 = 1_000_000.0;
/// 1-day APY change threshold for the yield point system (percent)
pub const POOL_VOLATILITY_THRESHOLD: f64 = 20.0;
/// APY above which a pool earns an extra risk point (percent)
pub const POOL_APY_THRESHOLD: f64 = 50.0;

/// Weighted change magnitude below which a series is `Stable` (percent)
pub const TREND_SIGNIFICANCE: f64 = 5.0;
/// Weight of the 7-day change in trend classification
pub const SHORT_TERM_WEIGHT: f64 = 0.7;
/// Weight of the 30-day change in trend classification
pub const LONG_TERM_WEIGHT: f64 = 0.3;
/// Samples considered for volatility
pub const VOLATILITY_WINDOW: usize = 30;

// ============================================================================
// Protocol risk
// ============================================================================

/// Size risk: > $1B low, > $100M medium, else high.
#[must_use]
pub fn tvl_risk(tvl: f64) -> RiskLevel {
    if tvl > TVL_LOW_RISK {
        RiskLevel::Low
    } else if tvl > TVL_MEDIUM_RISK {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Volatility risk is a two-value scale: high above 20% absolute change,
/// medium otherwise.
#[must_use]
pub fn volatility_risk(change_24h: f64) -> RiskLevel {
    if change_24h.abs() > VOLATILITY_HIGH_RISK {
        RiskLevel::High
    } else {
        RiskLevel::Medium
    }
}

/// Security risk with strict lower bounds: < 70 high, < 85 medium, else low.
#[must_use]
pub fn security_risk(score: f64) -> RiskLevel {
    if score < SECURITY_HIGH_RISK {
        RiskLevel::High
    } else if score < SECURITY_MEDIUM_RISK {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Average of the three factor weights: <= 1.5 low, <= 2.5 medium, else high.
#[must_use]
pub fn overall_risk(factors: &RiskFactors) -> RiskLevel {
    let total = u16::from(factors.tvl_risk.weight())
        + u16::from(factors.volatility_risk.weight())
        + u16::from(factors.security_risk.weight());
    let avg = f64::from(total) / 3.0;

    if avg <= 1.5 {
        RiskLevel::Low
    } else if avg <= 2.5 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

// ============================================================================
// Yield pools
// ============================================================================

/// Point-scored pool risk.
///
/// TVL < $1M +2, < $10M +1; 1-day APY change > 20 +2, > 10 +1; APY > 50 +1.
/// Total <= 1 low, <= 3 medium, else high. Missing inputs are scored as 0.
#[must_use]
pub fn pool_risk(tvl: f64, apy_change_1d: f64, apy: f64) -> RiskLevel {
    let mut points = 0u8;

    if tvl < POOL_TVL_THRESHOLD {
        points += 2;
    } else if tvl < POOL_TVL_THRESHOLD * 10.0 {
        points += 1;
    }

    if apy_change_1d > POOL_VOLATILITY_THRESHOLD {
        points += 2;
    } else if apy_change_1d > POOL_VOLATILITY_THRESHOLD / 2.0 {
        points += 1;
    }

    if apy > POOL_APY_THRESHOLD {
        points += 1;
    }

    match points {
        0 | 1 => RiskLevel::Low,
        2 | 3 => RiskLevel::Medium,
        _ => RiskLevel::High,
    }
}

/// Arithmetic mean of pool APYs, 0 for no pools.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn average_apy(pools: &[YieldOpportunity]) -> f64 {
    if pools.is_empty() {
        return 0.0;
    }
    pools.iter().map(|p| p.apy).sum::<f64>() / pools.len() as f64
}

/// Up to `n` pools ordered by APY, highest first.
#[must_use]
pub fn top_by_apy(pools: &[YieldOpportunity], n: usize) -> Vec<&YieldOpportunity> {
    let mut ranked: Vec<&YieldOpportunity> = pools.iter().collect();
    ranked.sort_by(|a, b| b.apy.total_cmp(&a.apy));
    ranked.truncate(n);
    ranked
}

/// Highest APY among pools, 0 for no pools.
#[must_use]
pub fn best_apy(pools: &[YieldOpportunity]) -> f64 {
    pools
        .iter()
        .map(|p| p.apy)
        .max_by(f64::total_cmp)
        .unwrap_or(0.0)
}

// ============================================================================
// Trends
// ============================================================================

/// Percent change from `previous` to `current`; 0 when there is no baseline.
#[must_use]
pub fn percentage_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 || previous.is_nan() {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

/// Sample `n` positions before the last one, 0 if the series is too short.
#[must_use]
pub fn sample_back(series: &[f64], n: usize) -> f64 {
    series
        .len()
        .checked_sub(n + 1)
        .map_or(0.0, |idx| series[idx])
}

/// Classify `0.7 * change_7d + 0.3 * change_30d`.
#[must_use]
pub fn classify_trend(change_7d: f64, change_30d: f64) -> Trend {
    let weighted = change_7d * SHORT_TERM_WEIGHT + change_30d * LONG_TERM_WEIGHT;

    if weighted.abs() < TREND_SIGNIFICANCE {
        Trend::Stable
    } else if weighted > 0.0 {
        Trend::Up
    } else {
        Trend::Down
    }
}

/// Trend of a daily series: last sample against 7 and 30 samples back.
#[must_use]
pub fn series_trend(series: &[f64]) -> SeriesTrend {
    let Some(&current) = series.last() else {
        return SeriesTrend::flat();
    };

    let change_7d = percentage_change(current, sample_back(series, 7));
    let change_30d = percentage_change(current, sample_back(series, 30));

    SeriesTrend {
        current,
        change_7d,
        change_30d,
        trend: classify_trend(change_7d, change_30d),
    }
}

/// Trend of 24h volume against daily averages of the 7d and 30d totals.
#[must_use]
pub fn volume_trend(current_24h: f64, total_7d: f64, total_30d: f64) -> SeriesTrend {
    let change_7d = percentage_change(current_24h, total_7d / 7.0);
    let change_30d = percentage_change(current_24h, total_30d / 30.0);

    SeriesTrend {
        current: current_24h,
        change_7d,
        change_30d,
        trend: classify_trend(change_7d, change_30d),
    }
}

/// Population std deviation of day-over-day returns over the trailing 30
/// samples, in percent. Fewer than two samples yield 0; a zero baseline
/// contributes a zero return.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn volatility(series: &[f64]) -> f64 {
    let window = &series[series.len().saturating_sub(VOLATILITY_WINDOW)..];
    if window.len() < 2 {
        return 0.0;
    }

    let returns: Vec<f64> = window
        .windows(2)
        .map(|pair| {
            if pair[0] == 0.0 {
                0.0
            } else {
                (pair[1] - pair[0]) / pair[0]
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() * 100.0
}

/// Share of total chain TVL in percent; 0 without a total.
#[must_use]
pub fn dominance(current_tvl: f64, total_chain_tvl: f64) -> f64 {
    if total_chain_tvl == 0.0 || total_chain_tvl.is_nan() {
        return 0.0;
    }
    current_tvl / total_chain_tvl * 100.0
}

/// `0.6 * tvl_change_30d + 0.4 * volume_change_30d`
#[must_use]
pub fn growth_score(tvl_change_30d: f64, volume_change_30d: f64) -> f64 {
    tvl_change_30d * 0.6 + volume_change_30d * 0.4
}
