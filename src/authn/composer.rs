//! Combines several policies into one decision.

use crate::authn::policy::{Policy, PolicyResult, PolicySpec};
use crate::authn::TransactionRecord;
use crate::error::{ConfigError, PolicyError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompositionMode {
    /// Every policy must be satisfied; stops at the first one that is not.
    #[default]
    RequireAll,
    /// One satisfied policy is enough; stops at the first one that is.
    RequireAny,
}

impl CompositionMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequireAll => "require-all",
            Self::RequireAny => "require-any",
        }
    }
}

impl fmt::Display for CompositionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompositionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "require-all" | "all" => Ok(Self::RequireAll),
            "require-any" | "any" => Ok(Self::RequireAny),
            _ => Err(ConfigError::UnknownComposition(s.to_string())),
        }
    }
}

/// Aggregate result of a composition, with the result of every policy that ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompositeResult {
    pub satisfied: bool,
    pub evaluated: Vec<PolicyResult>,
}

pub struct PolicyComposer {
    mode: CompositionMode,
    policies: Vec<Box<dyn Policy>>,
}

impl PolicyComposer {
    #[must_use]
    pub fn new(mode: CompositionMode) -> Self {
        Self {
            mode,
            policies: Vec::new(),
        }
    }

    /// Build a composer from policy specs, in order.
    ///
    /// # Errors
    /// Returns `ConfigError` if any spec is invalid.
    pub fn from_specs(mode: CompositionMode, specs: &[PolicySpec]) -> Result<Self, ConfigError> {
        let policies = specs
            .iter()
            .map(PolicySpec::build)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { mode, policies })
    }

    #[must_use]
    pub fn with_policy(mut self, policy: impl Policy + 'static) -> Self {
        self.policies.push(Box::new(policy));
        self
    }

    #[must_use]
    pub fn mode(&self) -> CompositionMode {
        self.mode
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Evaluate every policy against `record` according to the composition mode.
    ///
    /// With no policies the result is satisfied; whether that is acceptable is a
    /// configuration decision (see `AuthConfig::require_policy`).
    ///
    /// # Errors
    /// Returns the first `PolicyError`; later policies are not evaluated.
    pub fn evaluate(&self, record: &TransactionRecord) -> Result<CompositeResult, PolicyError> {
        if self.policies.is_empty() {
            warn!(attempt = %record.id(), "no authentication policy configured, defaulting to satisfied");
            return Ok(CompositeResult {
                satisfied: true,
                evaluated: Vec::new(),
            });
        }

        let mut evaluated = Vec::with_capacity(self.policies.len());
        for policy in &self.policies {
            let result = policy.evaluate(record)?;
            evaluated.push(result);

            match (self.mode, result.satisfied) {
                (CompositionMode::RequireAll, false) | (CompositionMode::RequireAny, true) => {
                    debug!(
                        attempt = %record.id(),
                        mode = %self.mode,
                        policy = result.policy,
                        satisfied = result.satisfied,
                        "policy composition short-circuited"
                    );
                    return Ok(CompositeResult {
                        satisfied: result.satisfied,
                        evaluated,
                    });
                }
                _ => {}
            }
        }

        // Ran to completion: all satisfied under RequireAll, none under RequireAny.
        Ok(CompositeResult {
            satisfied: self.mode == CompositionMode::RequireAll,
            evaluated,
        })
    }
}

impl fmt::Debug for PolicyComposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyComposer")
            .field("mode", &self.mode)
            .field(
                "policies",
                &self.policies.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
