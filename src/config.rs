//! Plain configuration structs handed to each component at construction.
//!
//! The CLI fills these from flags and `AUTHGATE_*` variables; embedding
//! applications can deserialize them from their own configuration files.

use crate::authn::{CompositionMode, PolicyComposer, PolicySpec};
use crate::error::ConfigError;
use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BLACKDOT_URL: &str = "https://check.getipintel.net/check.php";
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_CACHE_CAPACITY: usize = 1_024;
pub const DEFAULT_ALERT_SUBJECT: &str = "Authentication blocked by IP risk gating";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DecisionConfig {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub alert: Option<AlertConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub composition: CompositionMode,
    #[serde(default)]
    pub policies: Vec<PolicySpec>,
    /// Refuse to build a composer without policies instead of defaulting to satisfied.
    #[serde(default)]
    pub require_policy: bool,
}

impl AuthConfig {
    /// # Errors
    /// Returns `ConfigError` if a policy spec is invalid, or if no policy is
    /// configured while `require_policy` is set.
    pub fn composer(&self) -> Result<PolicyComposer, ConfigError> {
        if self.require_policy && self.policies.is_empty() {
            return Err(ConfigError::NoPolicy);
        }
        PolicyComposer::from_specs(self.composition, &self.policies)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Reject banned addresses outright. When false a ban is only logged.
    #[serde(default = "default_enforcing")]
    pub enforcing: bool,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Reputation source; `None` disables risk gating.
    #[serde(default)]
    pub blackdot: Option<BlackDotConfig>,
    /// `0` disables the verdict cache.
    #[serde(default)]
    pub cache_ttl_seconds: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl RiskConfig {
    /// # Errors
    /// Returns `ConfigError::ZeroTimeout` if the lookup timeout is zero.
    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(Duration::from_millis(self.timeout_ms))
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_seconds > 0).then(|| Duration::from_secs(self.cache_ttl_seconds))
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            enforcing: default_enforcing(),
            timeout_ms: default_timeout_ms(),
            blackdot: None,
            cache_ttl_seconds: 0,
            cache_capacity: default_cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlackDotConfig {
    #[serde(default = "default_blackdot_url")]
    pub url: String,
    /// Contact address the service requires to identify the caller.
    pub contact: SecretString,
    #[serde(default)]
    pub flags: Option<String>,
    #[serde(default = "default_ban_threshold")]
    pub ban_threshold: f64,
}

impl BlackDotConfig {
    #[must_use]
    pub fn new(contact: SecretString) -> Self {
        Self {
            url: default_blackdot_url(),
            contact,
            flags: None,
            ban_threshold: default_ban_threshold(),
        }
    }
}

/// Operator notification sent when an attempt is rejected as banned.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    pub from: String,
    #[serde(default)]
    pub to_email: Option<String>,
    #[serde(default)]
    pub to_phone: Option<String>,
    #[serde(default = "default_alert_subject")]
    pub subject: String,
}

const fn default_enforcing() -> bool {
    true
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

const fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

const fn default_ban_threshold() -> f64 {
    1.0
}

fn default_blackdot_url() -> String {
    DEFAULT_BLACKDOT_URL.to_string()
}

fn default_alert_subject() -> String {
    DEFAULT_ALERT_SUBJECT.to_string()
}
