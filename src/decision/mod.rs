//! Decision orchestration: risk gate first, then policy composition.
//!
//! Flow Overview:
//! 1) `Start`: examine the record's originating address.
//! 2) `RiskChecked`: a banned address under enforcing gating is rejected here and
//!    the policies are never evaluated.
//! 3) `PolicyEvaluated`: the composer judges the record.
//! 4) `Decided`: exactly one `accepted` or `rejected` verdict. Errors from either
//!    step end here as `rejected` with reason `evaluation-error`.

mod alert;

pub use alert::RiskAlert;

use crate::authn::{CompositeResult, PolicyComposer, PolicyResult, TransactionRecord};
use crate::config::DecisionConfig;
use crate::error::ConfigError;
use crate::notify::Communications;
use crate::risk::{BlackDotSource, ReputationSource, RiskGate, RiskVerdict};
use serde::Serialize;
use std::future::Future;
use tracing::{debug, info, instrument, warn};
use ulid::Ulid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionReason {
    RiskBanned,
    PolicyNotSatisfied,
    EvaluationError,
}

impl RejectionReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RiskBanned => "risk-banned",
            Self::PolicyNotSatisfied => "policy-not-satisfied",
            Self::EvaluationError => "evaluation-error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "kebab-case")]
pub enum Outcome {
    Accepted,
    Rejected(RejectionReason),
}

/// Final verdict for one authentication attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub attempt: Ulid,
    pub outcome: Outcome,
    pub risk: Option<RiskVerdict>,
    pub policies: Vec<PolicyResult>,
    /// Diagnostic detail; only shown to privileged callers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Decision {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.outcome == Outcome::Accepted
    }

    #[must_use]
    pub fn rejection(&self) -> Option<RejectionReason> {
        match self.outcome {
            Outcome::Accepted => None,
            Outcome::Rejected(reason) => Some(reason),
        }
    }

    /// Human readable summary. Unprivileged callers get a generic rejection without
    /// the reason or diagnostic detail.
    #[must_use]
    pub fn describe(&self, privileged: bool) -> String {
        match (self.outcome, privileged) {
            (Outcome::Accepted, _) => "accepted".to_string(),
            (Outcome::Rejected(_), false) => "rejected".to_string(),
            (Outcome::Rejected(reason), true) => match &self.detail {
                Some(detail) => format!("rejected: {}: {detail}", reason.as_str()),
                None => format!("rejected: {}", reason.as_str()),
            },
        }
    }

    /// Copy safe to hand to an unprivileged caller.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut decision = self.clone();
        decision.detail = None;
        if let Some(risk) = decision.risk.as_mut() {
            risk.detail = None;
        }
        decision
    }
}

enum Stage {
    Start,
    RiskChecked(RiskVerdict),
    PolicyEvaluated(Option<RiskVerdict>, CompositeResult),
    Decided(Decision),
}

pub struct DecisionOrchestrator<S = BlackDotSource> {
    gate: RiskGate<S>,
    composer: PolicyComposer,
    enforcing: bool,
    alert: Option<RiskAlert>,
}

impl DecisionOrchestrator<BlackDotSource> {
    /// Build every component from `config`.
    ///
    /// # Errors
    /// Returns `ConfigError` if any part of the configuration is invalid.
    pub fn from_config(
        config: &DecisionConfig,
        communications: Communications,
    ) -> Result<Self, ConfigError> {
        let gate = RiskGate::from_config(&config.risk)?;
        let composer = config.auth.composer()?;
        let orchestrator = Self::new(gate, composer, config.risk.enforcing);

        Ok(match &config.alert {
            Some(alert) => orchestrator.with_alert(RiskAlert::new(alert.clone(), communications)),
            None => orchestrator,
        })
    }
}

impl<S: ReputationSource> DecisionOrchestrator<S> {
    #[must_use]
    pub fn new(gate: RiskGate<S>, composer: PolicyComposer, enforcing: bool) -> Self {
        Self {
            gate,
            composer,
            enforcing,
            alert: None,
        }
    }

    #[must_use]
    pub fn with_alert(mut self, alert: RiskAlert) -> Self {
        self.alert = Some(alert);
        self
    }

    #[must_use]
    pub fn gate(&self) -> &RiskGate<S> {
        &self.gate
    }

    #[must_use]
    pub fn composer(&self) -> &PolicyComposer {
        &self.composer
    }

    /// Decide the attempt described by `record`. Never fails: every error becomes a
    /// rejection.
    #[instrument(skip_all, fields(attempt = %record.id(), origin = %record.origin()))]
    pub async fn decide(&self, record: &TransactionRecord) -> Decision {
        let mut stage = Stage::Start;
        loop {
            stage = match stage {
                Stage::Start => self.check_risk(record).await,
                Stage::RiskChecked(verdict) => self.evaluate_policies(record, Some(verdict)),
                Stage::PolicyEvaluated(verdict, result) => {
                    let outcome = if result.satisfied {
                        Outcome::Accepted
                    } else {
                        Outcome::Rejected(RejectionReason::PolicyNotSatisfied)
                    };
                    Stage::Decided(Decision {
                        attempt: record.id(),
                        outcome,
                        risk: verdict,
                        policies: result.evaluated,
                        detail: None,
                    })
                }
                Stage::Decided(decision) => {
                    info!(
                        outcome = ?decision.outcome,
                        risk = ?decision.risk.as_ref().map(|v| v.status),
                        "authentication decided"
                    );
                    return decision;
                }
            };
        }
    }

    /// Like [`decide`](Self::decide), but gives up when `cancelled` resolves first.
    /// The in-flight risk lookup is dropped and no verdict is produced.
    pub async fn decide_or_cancel<F>(&self, record: &TransactionRecord, cancelled: F) -> Option<Decision>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            decision = self.decide(record) => Some(decision),
            () = cancelled => {
                debug!(attempt = %record.id(), "authentication attempt cancelled before a decision");
                None
            }
        }
    }

    async fn check_risk(&self, record: &TransactionRecord) -> Stage {
        let verdict = match self.gate.examine(record.origin()).await {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!(error = %err, "risk examination failed");
                return Stage::Decided(Self::evaluation_error(record, None, err.to_string()));
            }
        };

        if verdict.is_banned() {
            if self.enforcing {
                warn!(address = %verdict.address, "address is banned, rejecting without policy evaluation");
                if let Some(alert) = &self.alert {
                    // Delivery runs detached; the verdict does not wait for it.
                    drop(alert.dispatch(record.id(), verdict.clone()));
                }
                return Stage::Decided(Decision {
                    attempt: record.id(),
                    outcome: Outcome::Rejected(RejectionReason::RiskBanned),
                    risk: Some(verdict),
                    policies: Vec::new(),
                    detail: None,
                });
            }
            warn!(address = %verdict.address, "address is banned but risk gating is not enforcing");
        }

        Stage::RiskChecked(verdict)
    }

    fn evaluate_policies(&self, record: &TransactionRecord, verdict: Option<RiskVerdict>) -> Stage {
        match self.composer.evaluate(record) {
            Ok(result) => Stage::PolicyEvaluated(verdict, result),
            Err(err) => {
                warn!(error = %err, "policy evaluation failed");
                Stage::Decided(Self::evaluation_error(record, verdict, err.to_string()))
            }
        }
    }

    fn evaluation_error(
        record: &TransactionRecord,
        verdict: Option<RiskVerdict>,
        detail: String,
    ) -> Decision {
        Decision {
            attempt: record.id(),
            outcome: Outcome::Rejected(RejectionReason::EvaluationError),
            risk: verdict,
            policies: Vec::new(),
            detail: Some(detail),
        }
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for DecisionOrchestrator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionOrchestrator")
            .field("gate", &self.gate)
            .field("composer", &self.composer)
            .field("enforcing", &self.enforcing)
            .field("alert", &self.alert)
            .finish()
    }
}
