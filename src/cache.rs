//! TTL-bounded cache of on-chain metrics
//!
//! Entries are keyed by protocol slug. Expiry is checked on read only: an
//! entry at least `ttl` old is removed and reported as absent, so callers
//! treat expired and missing entries identically. There is no background
//! sweep.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::OnchainMetrics;

/// Lifetime of an entry unless configured otherwise
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// A cached metric with its age and lifetime
#[derive(Debug, Clone)]
pub struct CachedMetric {
    /// The cached figures
    pub value: OnchainMetrics,
    /// When the figures were stored
    pub timestamp: Instant,
    /// Time-to-live
    pub ttl: Duration,
}

impl CachedMetric {
    /// Stamp `value` with the current time
    #[must_use]
    pub fn new(value: OnchainMetrics, ttl: Duration) -> Self {
        Self {
            value,
            timestamp: Instant::now(),
            ttl,
        }
    }

    /// Whether the entry is still servable at `now`
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.timestamp) < self.ttl
    }
}

/// Cache statistics tracked atomically
#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Thread-safe metrics cache
pub struct MetricsCache {
    entries: DashMap<String, CachedMetric>,
    ttl: Duration,
    stats: CacheStats,
}

impl MetricsCache {
    /// Create an empty cache whose entries live for `ttl`
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            stats: CacheStats::default(),
        }
    }

    /// TTL applied by [`store`](Self::store)
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for `protocol`, if any. Expired entries are evicted.
    pub fn get(&self, protocol: &str) -> Option<CachedMetric> {
        let now = Instant::now();

        let fresh = match self.entries.get(protocol) {
            Some(entry) if entry.is_fresh(now) => Some(entry.clone()),
            Some(_) => None,
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if fresh.is_some() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            // Only remove if still expired; a concurrent set may have refreshed it
            if self
                .entries
                .remove_if(protocol, |_, entry| !entry.is_fresh(now))
                .is_some()
            {
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
            }
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
        }

        fresh
    }

    /// Store a prepared entry
    pub fn set(&self, protocol: &str, metric: CachedMetric) {
        self.entries.insert(protocol.to_string(), metric);
    }

    /// Store `value` stamped now with the cache's TTL
    pub fn store(&self, protocol: &str, value: OnchainMetrics) {
        self.set(protocol, CachedMetric::new(value, self.ttl));
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            size: self.entries.len(),
        }
    }
}

impl Default for MetricsCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Snapshot of cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStatsSnapshot {
    /// Total cache hits
    pub hits: u64,
    /// Total misses, expired entries included
    pub misses: u64,
    /// Expired entries removed on read
    pub evictions: u64,
    /// Current number of entries
    pub size: usize,
}
