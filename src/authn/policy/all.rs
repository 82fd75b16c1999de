use super::{Policy, PolicyResult};
use crate::authn::TransactionRecord;
use crate::error::PolicyError;
use tracing::debug;

/// Satisfied only when every submitted credential validated successfully.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllPolicy;

impl AllPolicy {
    pub const NAME: &'static str = "all";
}

impl Policy for AllPolicy {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn evaluate(&self, record: &TransactionRecord) -> Result<PolicyResult, PolicyError> {
        let submitted = record.credentials().len();
        let satisfied =
            submitted > 0 && record.failures().is_empty() && record.successes().len() == submitted;

        debug!(
            attempt = %record.id(),
            submitted,
            successes = record.successes().len(),
            failures = record.failures().len(),
            satisfied,
            "evaluated all-credentials policy"
        );

        Ok(PolicyResult {
            policy: Self::NAME,
            satisfied,
        })
    }
}
