//! Adaptive risk gating based on IP address reputation.
//!
//! Flow Overview:
//! 1) Parse the address locally; malformed input never reaches the network.
//! 2) Without a configured source the gate is disabled and answers `unknown`.
//! 3) Otherwise one lookup is made, bounded by the configured timeout, no retries.
//! 4) Listed addresses are `banned`, unlisted ones `allowed`; any failure is `unknown`.

pub mod blackdot;
pub mod cache;

pub use blackdot::BlackDotSource;
pub use cache::VerdictCache;

use crate::config::RiskConfig;
use crate::error::{ConfigError, RiskError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskStatus {
    Allowed,
    Banned,
    Unknown,
}

/// Where a verdict came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictSource {
    /// Answered by the reputation source.
    Feed,
    /// Answered from a previous lookup still within its TTL.
    Cache,
    /// No reputation source configured.
    Disabled,
    /// The source failed, timed out or answered garbage.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskVerdict {
    pub address: String,
    pub status: RiskStatus,
    pub source: VerdictSource,
    /// Raw reputation score reported by the source, when there is one.
    pub score: Option<f64>,
    /// Why the verdict is `unknown` when the source was unavailable.
    pub detail: Option<String>,
    pub evaluated_at: DateTime<Utc>,
}

impl RiskVerdict {
    #[must_use]
    pub fn new(address: impl Into<String>, status: RiskStatus, source: VerdictSource) -> Self {
        Self {
            address: address.into(),
            status,
            source,
            score: None,
            detail: None,
            evaluated_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_banned(&self) -> bool {
        self.status == RiskStatus::Banned
    }

    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.status == RiskStatus::Allowed
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.status == RiskStatus::Unknown
    }
}

/// Classification returned by a reputation source for one address.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Listing {
    pub listed: bool,
    pub score: Option<f64>,
}

/// External reputation service consulted by the gate.
pub trait ReputationSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Classify `address`. A single attempt; the gate bounds it with a timeout.
    fn lookup(&self, address: IpAddr) -> impl Future<Output = Result<Listing, RiskError>> + Send;
}

#[derive(Debug)]
pub struct RiskGate<S = BlackDotSource> {
    source: Option<S>,
    timeout: Duration,
    cache: Option<VerdictCache>,
}

impl RiskGate<BlackDotSource> {
    /// Build the gate described by `config`; disabled when no source is configured.
    ///
    /// # Errors
    /// Returns `ConfigError` if the timeout is zero or the source settings are invalid.
    pub fn from_config(config: &RiskConfig) -> Result<Self, ConfigError> {
        let timeout = config.timeout()?;
        let gate = match &config.blackdot {
            Some(blackdot) => Self::new(BlackDotSource::new(blackdot, timeout)?, timeout),
            None => Self::disabled(timeout),
        };

        Ok(match config.cache_ttl() {
            Some(ttl) => gate.with_cache(ttl, config.cache_capacity),
            None => gate,
        })
    }
}

impl<S: ReputationSource> RiskGate<S> {
    #[must_use]
    pub fn new(source: S, timeout: Duration) -> Self {
        Self {
            source: Some(source),
            timeout,
            cache: None,
        }
    }

    /// A gate with no reputation source; every valid address is `unknown`.
    #[must_use]
    pub fn disabled(timeout: Duration) -> Self {
        Self {
            source: None,
            timeout,
            cache: None,
        }
    }

    /// Cache definitive verdicts for `ttl`, keeping at most `capacity` addresses.
    #[must_use]
    pub fn with_cache(mut self, ttl: Duration, capacity: usize) -> Self {
        self.cache = Some(VerdictCache::new(ttl, capacity));
        self
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.source.is_some()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Examine `address` and produce a verdict.
    ///
    /// Source failures are downgraded to an `unknown` verdict and never surface as
    /// errors.
    ///
    /// # Errors
    /// Returns `RiskError::InvalidAddress` if `address` is not an IPv4/IPv6 literal.
    #[instrument(skip(self))]
    pub async fn examine(&self, address: &str) -> Result<RiskVerdict, RiskError> {
        let ip = parse_address(address)?;

        let Some(source) = &self.source else {
            debug!("no intelligence source configured, risk gating disabled");
            return Ok(RiskVerdict::new(
                ip.to_string(),
                RiskStatus::Unknown,
                VerdictSource::Disabled,
            ));
        };

        if let Some(mut cached) = self.cache.as_ref().and_then(|cache| cache.get(&ip)) {
            debug!(status = ?cached.status, "risk verdict served from cache");
            cached.source = VerdictSource::Cache;
            return Ok(cached);
        }

        match self.lookup(source, ip).await {
            Ok(listing) => {
                let status = if listing.listed {
                    RiskStatus::Banned
                } else {
                    RiskStatus::Allowed
                };
                let mut verdict = RiskVerdict::new(ip.to_string(), status, VerdictSource::Feed);
                verdict.score = listing.score;

                debug!(source = source.name(), status = ?status, score = ?listing.score, "address examined");

                if let Some(cache) = &self.cache {
                    cache.insert(ip, verdict.clone());
                }
                Ok(verdict)
            }
            Err(err) => {
                warn!(source = source.name(), error = %err, "intelligence source unavailable, verdict unknown");
                let mut verdict =
                    RiskVerdict::new(ip.to_string(), RiskStatus::Unknown, VerdictSource::Unavailable);
                verdict.detail = Some(err.to_string());
                Ok(verdict)
            }
        }
    }

    async fn lookup(&self, source: &S, ip: IpAddr) -> Result<Listing, RiskError> {
        match timeout(self.timeout, source.lookup(ip)).await {
            Ok(result) => result,
            Err(_) => Err(RiskError::SourceUnavailable(format!(
                "lookup timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

/// Parse an IPv4/IPv6 literal, tolerating surrounding whitespace.
///
/// # Errors
/// Returns `RiskError::InvalidAddress` for anything else (host names included).
pub fn parse_address(address: &str) -> Result<IpAddr, RiskError> {
    address
        .trim()
        .parse::<IpAddr>()
        .map_err(|_| RiskError::InvalidAddress(address.to_string()))
}
