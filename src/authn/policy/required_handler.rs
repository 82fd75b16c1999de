use super::{Policy, PolicyResult};
use crate::authn::TransactionRecord;
use crate::error::{ConfigError, PolicyError};
use tracing::{debug, warn};

/// Satisfied when the named validation handler accepted one of the credentials.
#[derive(Debug, Clone)]
pub struct RequiredHandlerPolicy {
    handler: String,
    try_all: bool,
}

impl RequiredHandlerPolicy {
    pub const NAME: &'static str = "required-handler";

    /// # Errors
    /// Returns `ConfigError::MissingHandler` if `handler` is blank.
    pub fn new(handler: impl Into<String>, try_all: bool) -> Result<Self, ConfigError> {
        let handler = handler.into().trim().to_string();
        if handler.is_empty() {
            return Err(ConfigError::MissingHandler);
        }
        Ok(Self { handler, try_all })
    }

    #[must_use]
    pub fn handler(&self) -> &str {
        &self.handler
    }
}

impl Policy for RequiredHandlerPolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn evaluate(&self, record: &TransactionRecord) -> Result<PolicyResult, PolicyError> {
        if record.credentials().is_empty() {
            return Err(PolicyError::EmptyCredentials { policy: Self::NAME });
        }

        if self.try_all && !record.is_complete() {
            warn!(
                attempt = %record.id(),
                credentials = record.credentials().len(),
                outcomes = record.outcomes(),
                "number of provided credentials does not match the sum of successes and failures"
            );
            return Ok(PolicyResult::not_satisfied(Self::NAME));
        }

        let satisfied = record
            .successes()
            .values()
            .any(|success| success.handler == self.handler);

        debug!(
            attempt = %record.id(),
            handler = %self.handler,
            satisfied,
            "evaluated required-handler policy"
        );

        Ok(PolicyResult {
            policy: Self::NAME,
            satisfied,
        })
    }
}
