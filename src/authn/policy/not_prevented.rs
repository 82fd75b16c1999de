use super::{AnyPolicy, Policy, PolicyResult};
use crate::authn::{FailureCause, TransactionRecord};
use crate::error::PolicyError;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Fails when any credential failed for a disqualifying cause (a locked or
/// disabled account, an expired credential); otherwise behaves as [`AnyPolicy`].
#[derive(Debug, Clone)]
pub struct NotPreventedPolicy {
    try_all: bool,
    disqualifying: HashSet<FailureCause>,
}

impl NotPreventedPolicy {
    pub const NAME: &'static str = "not-prevented";

    #[must_use]
    pub fn new(try_all: bool, disqualifying: HashSet<FailureCause>) -> Self {
        Self {
            try_all,
            disqualifying,
        }
    }

    #[must_use]
    pub fn disqualifying(&self) -> &HashSet<FailureCause> {
        &self.disqualifying
    }
}

impl Default for NotPreventedPolicy {
    fn default() -> Self {
        Self::new(false, FailureCause::default_disqualifying())
    }
}

impl Policy for NotPreventedPolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn evaluate(&self, record: &TransactionRecord) -> Result<PolicyResult, PolicyError> {
        if record.credentials().is_empty() {
            return Err(PolicyError::EmptyCredentials { policy: Self::NAME });
        }

        let prevented = record
            .failures()
            .iter()
            .find(|(_, failure)| self.disqualifying.contains(&failure.cause));

        if let Some((credential, failure)) = prevented {
            warn!(
                attempt = %record.id(),
                credential = %credential,
                cause = %failure.cause,
                "authentication prevented by disqualifying failure"
            );
            return Ok(PolicyResult::not_satisfied(Self::NAME));
        }

        let satisfied = AnyPolicy::is_satisfied(self.try_all, record);
        debug!(attempt = %record.id(), satisfied, "no disqualifying failure found");

        Ok(PolicyResult {
            policy: Self::NAME,
            satisfied,
        })
    }
}
