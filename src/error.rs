//! Error types shared by the decision core.
//!
//! None of these cross the [`DecisionOrchestrator`](crate::decision::DecisionOrchestrator)
//! boundary: the orchestrator maps every one of them to a rejected decision.

use crate::authn::Credential;
use thiserror::Error;

/// Invalid mutation of a transaction record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("credential {0} was not part of the submission")]
    UnknownCredential(Credential),
    #[error("credential {0} already has a recorded outcome")]
    AlreadyRecorded(Credential),
    #[error("credential {0} was submitted more than once")]
    DuplicateCredential(Credential),
}

/// A record is structurally unusable for a policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("policy {policy} requires at least one submitted credential")]
    EmptyCredentials { policy: &'static str },
}

/// Failure of a single risk examination.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RiskError {
    #[error("invalid network address: {0}")]
    InvalidAddress(String),
    #[error("intelligence source unavailable: {0}")]
    SourceUnavailable(String),
}

/// Invalid static configuration, detected before any request is served.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown policy: {0}")]
    UnknownPolicy(String),
    #[error("unknown composition mode: {0}")]
    UnknownComposition(String),
    #[error("unknown failure cause: {0}")]
    UnknownCause(String),
    #[error("required-handler policy needs a handler name")]
    MissingHandler,
    #[error("no authentication policy configured")]
    NoPolicy,
    #[error("risk lookup timeout must be greater than zero")]
    ZeroTimeout,
    #[error("invalid intelligence source URL: {0}")]
    InvalidSourceUrl(String),
    #[error("intelligence source contact must not be blank")]
    BlankContact,
    #[error("ban threshold must be within (0, 1]: {0}")]
    InvalidBanThreshold(String),
}
