//! Per-attempt record of submitted credentials and their validation outcomes.

use crate::error::{ConfigError, RecordError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Opaque reference to a submitted credential (a username/secret pair, a token, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Credential {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Why a credential failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureCause {
    InvalidCredential,
    AccountNotFound,
    AccountLocked,
    AccountDisabled,
    CredentialExpired,
    PasswordMustChange,
    InvalidLoginLocation,
    InvalidLoginHours,
    Other,
}

impl FailureCause {
    pub const ALL: [Self; 9] = [
        Self::InvalidCredential,
        Self::AccountNotFound,
        Self::AccountLocked,
        Self::AccountDisabled,
        Self::CredentialExpired,
        Self::PasswordMustChange,
        Self::InvalidLoginLocation,
        Self::InvalidLoginHours,
        Self::Other,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidCredential => "invalid-credential",
            Self::AccountNotFound => "account-not-found",
            Self::AccountLocked => "account-locked",
            Self::AccountDisabled => "account-disabled",
            Self::CredentialExpired => "credential-expired",
            Self::PasswordMustChange => "password-must-change",
            Self::InvalidLoginLocation => "invalid-login-location",
            Self::InvalidLoginHours => "invalid-login-hours",
            Self::Other => "other",
        }
    }

    /// Causes that prevent authentication outright unless configured otherwise.
    #[must_use]
    pub fn default_disqualifying() -> HashSet<Self> {
        HashSet::from([
            Self::AccountLocked,
            Self::AccountDisabled,
            Self::CredentialExpired,
        ])
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureCause {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|cause| cause.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownCause(s.to_string()))
    }
}

/// Result of a successful validation: the resolved principal and its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationSuccess {
    pub principal: String,
    /// Name of the validation handler that accepted the credential.
    pub handler: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl AuthenticationSuccess {
    #[must_use]
    pub fn new(principal: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            handler: handler.into(),
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationFailure {
    pub handler: String,
    pub cause: FailureCause,
    #[serde(default)]
    pub message: Option<String>,
}

impl AuthenticationFailure {
    #[must_use]
    pub fn new(handler: impl Into<String>, cause: FailureCause) -> Self {
        Self {
            handler: handler.into(),
            cause,
            message: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Credentials submitted for one authentication attempt and what became of them.
///
/// Mutation needs `&mut self`; share the record only after validation has finished.
#[derive(Debug, Clone)]
pub struct TransactionRecord {
    id: Ulid,
    origin: String,
    credentials: Vec<Credential>,
    successes: HashMap<Credential, AuthenticationSuccess>,
    failures: HashMap<Credential, AuthenticationFailure>,
}

impl TransactionRecord {
    /// Start a record for credentials submitted from `origin`.
    ///
    /// # Errors
    /// Returns `RecordError::DuplicateCredential` if a credential is submitted twice.
    pub fn new<I>(origin: impl Into<String>, credentials: I) -> Result<Self, RecordError>
    where
        I: IntoIterator<Item = Credential>,
    {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        for credential in credentials {
            if !seen.insert(credential.clone()) {
                return Err(RecordError::DuplicateCredential(credential));
            }
            ordered.push(credential);
        }

        Ok(Self {
            id: Ulid::new(),
            origin: origin.into(),
            credentials: ordered,
            successes: HashMap::new(),
            failures: HashMap::new(),
        })
    }

    /// Record a successful validation.
    ///
    /// # Errors
    /// Returns an error if the credential was never submitted or already has an outcome.
    pub fn add_success(
        &mut self,
        credential: &Credential,
        result: AuthenticationSuccess,
    ) -> Result<(), RecordError> {
        self.ensure_pending(credential)?;
        self.successes.insert(credential.clone(), result);
        Ok(())
    }

    /// Record a failed validation.
    ///
    /// # Errors
    /// Returns an error if the credential was never submitted or already has an outcome.
    pub fn add_failure(
        &mut self,
        credential: &Credential,
        failure: AuthenticationFailure,
    ) -> Result<(), RecordError> {
        self.ensure_pending(credential)?;
        self.failures.insert(credential.clone(), failure);
        Ok(())
    }

    fn ensure_pending(&self, credential: &Credential) -> Result<(), RecordError> {
        if !self.credentials.contains(credential) {
            return Err(RecordError::UnknownCredential(credential.clone()));
        }
        if self.successes.contains_key(credential) || self.failures.contains_key(credential) {
            return Err(RecordError::AlreadyRecorded(credential.clone()));
        }
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> Ulid {
        self.id
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    #[must_use]
    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    #[must_use]
    pub fn successes(&self) -> &HashMap<Credential, AuthenticationSuccess> {
        &self.successes
    }

    #[must_use]
    pub fn failures(&self) -> &HashMap<Credential, AuthenticationFailure> {
        &self.failures
    }

    /// Number of credentials with a recorded outcome.
    #[must_use]
    pub fn outcomes(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// True once every submitted credential has an outcome.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.outcomes() == self.credentials.len()
    }
}
