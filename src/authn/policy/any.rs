use super::{Policy, PolicyResult};
use crate::authn::TransactionRecord;
use crate::error::PolicyError;
use tracing::{debug, warn};

/// Satisfied by at least one successfully validated credential.
///
/// With `try_all` set, every submitted credential must also have an outcome before
/// the policy can be satisfied.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyPolicy {
    try_all: bool,
}

impl AnyPolicy {
    pub const NAME: &'static str = "any";

    #[must_use]
    pub const fn new(try_all: bool) -> Self {
        Self { try_all }
    }

    #[must_use]
    pub const fn try_all(&self) -> bool {
        self.try_all
    }

    /// Shared by policies that fall back to "any" semantics.
    pub(crate) fn is_satisfied(try_all: bool, record: &TransactionRecord) -> bool {
        if try_all && !record.is_complete() {
            warn!(
                attempt = %record.id(),
                credentials = record.credentials().len(),
                outcomes = record.outcomes(),
                "number of provided credentials does not match the sum of successes and failures"
            );
            return false;
        }

        if record.successes().is_empty() {
            warn!(
                attempt = %record.id(),
                "no successful authentication found"
            );
            return false;
        }

        debug!(attempt = %record.id(), try_all, "found at least one successful authentication");
        true
    }
}

impl Policy for AnyPolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn evaluate(&self, record: &TransactionRecord) -> Result<PolicyResult, PolicyError> {
        Ok(PolicyResult {
            policy: Self::NAME,
            satisfied: Self::is_satisfied(self.try_all, record),
        })
    }
}
