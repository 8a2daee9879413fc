//! Configuration management

use std::{collections::HashMap, path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Environment files to load before processing config.
    /// Paths support ~ expansion. Loaded in order, later files override earlier.
    pub env_files: Vec<String>,
    /// Upstream endpoints
    pub sources: SourcesConfig,
    /// Per-domain admission budgets and 429 handling
    pub admission: AdmissionConfig,
    /// Outbound HTTP settings
    pub http: HttpConfig,
    /// Metrics cache settings
    pub cache: CacheConfig,
    /// Stated-figure verification settings
    pub claims: ClaimsConfig,
    /// Governance query settings
    pub governance: GovernanceConfig,
}

/// Upstream base URLs. Paths below these are fixed per adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// TVL provider (protocols, chains, DEX volume)
    pub llama_url: String,
    /// Yield pools provider
    pub yields_url: String,
    /// Safety score provider
    pub safety_url: String,
    /// Sentiment and developer activity GraphQL endpoint
    pub santiment_url: String,
    /// Primary governance GraphQL endpoint
    pub snapshot_url: String,
    /// Secondary governance GraphQL endpoint
    pub tally_url: String,
    /// Token price provider
    pub prices_url: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            llama_url: "https://api.llama.fi".to_string(),
            yields_url: "https://yields.llama.fi".to_string(),
            safety_url: "https://api.defisafety.com/v1".to_string(),
            santiment_url: "https://api.santiment.net/graphql".to_string(),
            snapshot_url: "https://hub.snapshot.org/graphql".to_string(),
            tally_url: "https://api.tally.xyz/query".to_string(),
            prices_url: "https://api.coingecko.com/api/v3".to_string(),
        }
    }
}

/// A sliding-window request budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBudget {
    /// Requests allowed inside one window
    pub max_requests: u32,
    /// Window length
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

impl RateBudget {
    /// Budget of `max_requests` per minute
    #[must_use]
    pub const fn per_minute(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(60),
        }
    }
}

/// Admission control configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Budget for domains without an entry in `domains`
    pub default: RateBudget,
    /// Budgets keyed by upstream host
    pub domains: HashMap<String, RateBudget>,
    /// Retries after an HTTP 429
    pub max_retries: u32,
    /// Wait used when `retry-after` is absent or unusable
    #[serde(with = "humantime_serde")]
    pub default_retry_after: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        let domains = [
            ("api.llama.fi", 30),
            ("api.defisafety.com", 10),
            ("hub.snapshot.org", 20),
            ("api.tally.xyz", 15),
            ("api.santiment.net", 25),
        ]
        .into_iter()
        .map(|(host, max)| (host.to_string(), RateBudget::per_minute(max)))
        .collect();

        Self {
            default: RateBudget::per_minute(10),
            domains,
            max_retries: 3,
            default_retry_after: Duration::from_secs(60),
        }
    }
}

impl AdmissionConfig {
    /// Budget applying to `domain`
    #[must_use]
    pub fn budget_for(&self, domain: &str) -> RateBudget {
        self.domains.get(domain).copied().unwrap_or(self.default)
    }
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Deadline for a single upstream request
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// User agent sent upstream
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("defi-insight/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Metrics cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Age at which a cached metric stops being served
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: crate::cache::DEFAULT_TTL,
        }
    }
}

/// Stated-figure verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimsConfig {
    /// Maximum relative deviation from on-chain TVL (0.05 = 5%)
    pub tolerance: f64,
}

impl Default for ClaimsConfig {
    fn default() -> Self {
        Self { tolerance: 0.05 }
    }
}

/// Governance query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Proposals requested from each provider
    pub proposal_limit: u32,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self { proposal_limit: 10 }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Env files must land in the process environment before it is read
        let env_files: Vec<String> = figment
            .extract_inner("env_files")
            .map_err(|e| Error::Config(e.to_string()))?;
        load_env_files(&env_files);

        // Merge environment variables (DEFI_INSIGHT_ prefix)
        figment = figment.merge(Env::prefixed("DEFI_INSIGHT_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Reject budgets that can never admit a request
    fn validate(&self) -> Result<()> {
        let budgets =
            std::iter::once(("default", &self.admission.default)).chain(
                self.admission
                    .domains
                    .iter()
                    .map(|(domain, budget)| (domain.as_str(), budget)),
            );

        for (domain, budget) in budgets {
            if budget.max_requests == 0 {
                return Err(Error::Config(format!(
                    "admission budget for {domain} must allow at least one request"
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.claims.tolerance) {
            return Err(Error::Config(format!(
                "claims.tolerance must be within 0..=1, got {}",
                self.claims.tolerance
            )));
        }

        Ok(())
    }
}

/// Load environment files into the process environment.
/// Supports ~ expansion. Files that don't exist are silently skipped.
/// Variables already set in the environment are not overridden.
fn load_env_files(paths: &[String]) {
    for path_str in paths {
        let expanded = match (path_str.strip_prefix('~'), dirs::home_dir()) {
            (Some(rest), Some(home)) => format!("{}{rest}", home.display()),
            _ => path_str.clone(),
        };

        let path = Path::new(&expanded);
        if path.exists() {
            match dotenvy::from_path(path) {
                Ok(()) => tracing::info!("Loaded env file: {expanded}"),
                Err(e) => tracing::warn!("Failed to load env file {expanded}: {e}"),
            }
        } else {
            tracing::debug!("Env file not found (skipped): {expanded}");
        }
    }
}
