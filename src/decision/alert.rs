//! Operator alert for attempts rejected by risk gating.

use crate::config::AlertConfig;
use crate::notify::{Communications, EmailMessage, SmsMessage};
use crate::risk::RiskVerdict;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use ulid::Ulid;

/// Best-effort notification; its outcome never changes a decision.
#[derive(Debug, Clone)]
pub struct RiskAlert {
    config: AlertConfig,
    communications: Communications,
}

impl RiskAlert {
    #[must_use]
    pub fn new(config: AlertConfig, communications: Communications) -> Self {
        Self {
            config,
            communications,
        }
    }

    /// Hand the alert to the blocking pool so delivery never delays the verdict.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, attempt: Ulid, verdict: RiskVerdict) -> JoinHandle<usize> {
        let alert = self.clone();
        debug!(%attempt, "risk alert dispatched");
        tokio::task::spawn_blocking(move || alert.notify(attempt, &verdict))
    }

    /// Send the configured email and/or SMS. Returns how many messages went out.
    ///
    /// Senders are synchronous and may block for as long as delivery takes.
    pub fn notify(&self, attempt: Ulid, verdict: &RiskVerdict) -> usize {
        let body = format!(
            "Authentication attempt {} from {} was rejected: the address is banned by IP risk gating (score: {}).",
            attempt,
            verdict.address,
            verdict
                .score
                .map_or_else(|| "n/a".to_string(), |score| score.to_string()),
        );

        let mut sent = 0;

        if let Some(to) = &self.config.to_email {
            let message = EmailMessage {
                to: to.clone(),
                from: self.config.from.clone(),
                subject: self.config.subject.clone(),
                body: body.clone(),
                cc: None,
                bcc: None,
            };
            if self.communications.send_email(&message) {
                sent += 1;
            }
        }

        if let Some(to) = &self.config.to_phone {
            let message = SmsMessage {
                from: self.config.from.clone(),
                to: to.clone(),
                body,
            };
            if self.communications.send_sms(&message) {
                sent += 1;
            }
        }

        if sent == 0 {
            warn!(%attempt, "risk alert was not delivered");
        } else {
            debug!(%attempt, sent, "risk alert delivered");
        }
        sent
    }
}
