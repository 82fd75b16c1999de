//! Authentication policies.
//!
//! A policy is a pure function of a [`TransactionRecord`]: it never mutates the
//! record and returns the same answer every time it sees the same record.

mod all;
mod any;
mod not_prevented;
mod required_handler;

pub use all::AllPolicy;
pub use any::AnyPolicy;
pub use not_prevented::NotPreventedPolicy;
pub use required_handler::RequiredHandlerPolicy;

use crate::authn::{FailureCause, TransactionRecord};
use crate::error::{ConfigError, PolicyError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Outcome of evaluating one policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PolicyResult {
    pub policy: &'static str,
    pub satisfied: bool,
}

impl PolicyResult {
    #[must_use]
    pub const fn satisfied(policy: &'static str) -> Self {
        Self {
            policy,
            satisfied: true,
        }
    }

    #[must_use]
    pub const fn not_satisfied(policy: &'static str) -> Self {
        Self {
            policy,
            satisfied: false,
        }
    }
}

pub trait Policy: Send + Sync {
    /// Short, stable name used in logs and configuration.
    fn name(&self) -> &'static str;

    /// Decide whether `record` satisfies this policy.
    ///
    /// # Errors
    /// Returns `PolicyError` if the record is structurally invalid for this policy.
    fn evaluate(&self, record: &TransactionRecord) -> Result<PolicyResult, PolicyError>;
}

/// Configurable description of a policy, as found in configuration files or CLI flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PolicySpec {
    Any {
        #[serde(default)]
        try_all: bool,
    },
    All,
    NotPrevented {
        #[serde(default)]
        try_all: bool,
        #[serde(default)]
        disqualifying: Option<HashSet<FailureCause>>,
    },
    RequiredHandler {
        handler: String,
        #[serde(default)]
        try_all: bool,
    },
}

impl PolicySpec {
    pub const NAMES: [&'static str; 4] = ["any", "all", "not-prevented", "required-handler"];

    /// Spec for the policy called `name`, filled from flat settings.
    ///
    /// `handler` is only read by `required-handler` and `disqualifying` only by
    /// `not-prevented`.
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownPolicy` for an unrecognized name, or
    /// `ConfigError::MissingHandler` when `required-handler` has no handler.
    pub fn named(
        name: &str,
        try_all: bool,
        handler: Option<&str>,
        disqualifying: Option<&HashSet<FailureCause>>,
    ) -> Result<Self, ConfigError> {
        match name.trim().to_lowercase().as_str() {
            "any" => Ok(Self::Any { try_all }),
            "all" => Ok(Self::All),
            "not-prevented" | "not_prevented" => Ok(Self::NotPrevented {
                try_all,
                disqualifying: disqualifying.cloned(),
            }),
            "required-handler" | "required_handler" => {
                let handler = handler
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .ok_or(ConfigError::MissingHandler)?;
                Ok(Self::RequiredHandler {
                    handler: handler.to_string(),
                    try_all,
                })
            }
            _ => Err(ConfigError::UnknownPolicy(name.to_string())),
        }
    }

    /// Build the policy described by this spec.
    ///
    /// # Errors
    /// Returns `ConfigError` if a required parameter is missing.
    pub fn build(&self) -> Result<Box<dyn Policy>, ConfigError> {
        Ok(match self {
            Self::Any { try_all } => Box::new(AnyPolicy::new(*try_all)),
            Self::All => Box::new(AllPolicy),
            Self::NotPrevented {
                try_all,
                disqualifying,
            } => Box::new(NotPreventedPolicy::new(
                *try_all,
                disqualifying
                    .clone()
                    .unwrap_or_else(FailureCause::default_disqualifying),
            )),
            Self::RequiredHandler { handler, try_all } => {
                Box::new(RequiredHandlerPolicy::new(handler.clone(), *try_all)?)
            }
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_builds_named_policies() -> Result<(), ConfigError> {
        let specs = vec![
            PolicySpec::Any { try_all: false },
            PolicySpec::All,
            PolicySpec::NotPrevented {
                try_all: false,
                disqualifying: None,
            },
            PolicySpec::RequiredHandler {
                handler: "ldap".to_string(),
                try_all: false,
            },
        ];
        let names = specs
            .iter()
            .map(|spec| spec.build().map(|policy| policy.name()))
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(names, PolicySpec::NAMES.to_vec());
        Ok(())
    }

    #[test]
    fn spec_rejects_blank_handler() {
        let spec = PolicySpec::RequiredHandler {
            handler: "  ".to_string(),
            try_all: false,
        };
        assert_eq!(spec.build().err(), Some(ConfigError::MissingHandler));
    }

    #[test]
    fn spec_deserializes_from_json() -> Result<(), serde_json::Error> {
        let spec: PolicySpec = serde_json::from_str(
            r#"{"type": "not-prevented", "disqualifying": ["account-locked"]}"#,
        )?;
        assert_eq!(
            spec,
            PolicySpec::NotPrevented {
                try_all: false,
                disqualifying: Some(HashSet::from([FailureCause::AccountLocked])),
            }
        );
        Ok(())
    }

    #[test]
    fn named_specs_follow_flat_settings() -> Result<(), ConfigError> {
        assert_eq!(
            PolicySpec::named("Any", true, None, None)?,
            PolicySpec::Any { try_all: true }
        );
        assert_eq!(
            PolicySpec::named("required_handler", false, Some(" ldap "), None)?,
            PolicySpec::RequiredHandler {
                handler: "ldap".to_string(),
                try_all: false,
            }
        );
        assert_eq!(
            PolicySpec::named("required-handler", false, None, None),
            Err(ConfigError::MissingHandler)
        );
        assert_eq!(
            PolicySpec::named("majority", false, None, None),
            Err(ConfigError::UnknownPolicy("majority".to_string()))
        );
        Ok(())
    }
}
