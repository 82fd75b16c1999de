//! Mail and SMS notification capability.
//!
//! Real transports live outside this crate; they plug in through [`EmailSender`]
//! and [`SmsSender`]. The log senders are what the CLI uses.

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SmsMessage {
    pub from: String,
    pub to: String,
    pub body: String,
}

pub trait EmailSender: Send + Sync {
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

pub trait SmsSender: Send + Sync {
    fn send(&self, message: &SmsMessage) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to = %message.to,
            from = %message.from,
            subject = %message.subject,
            cc = ?message.cc,
            bcc = ?message.bcc,
            "email send stub"
        );
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct LogSmsSender;

impl SmsSender for LogSmsSender {
    fn send(&self, message: &SmsMessage) -> Result<()> {
        info!(to = %message.to, from = %message.from, "sms send stub");
        Ok(())
    }
}

/// Front for the optional mail and SMS senders.
///
/// Sending never fails loudly: a missing sender, a blank field or a transport
/// error is logged and reported as `false`.
#[derive(Clone, Default)]
pub struct Communications {
    email: Option<Arc<dyn EmailSender>>,
    sms: Option<Arc<dyn SmsSender>>,
}

impl Communications {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_email(mut self, sender: Arc<dyn EmailSender>) -> Self {
        self.email = Some(sender);
        self
    }

    #[must_use]
    pub fn with_sms(mut self, sender: Arc<dyn SmsSender>) -> Self {
        self.sms = Some(sender);
        self
    }

    #[must_use]
    pub fn is_email_defined(&self) -> bool {
        self.email.is_some()
    }

    #[must_use]
    pub fn is_sms_defined(&self) -> bool {
        self.sms.is_some()
    }

    /// True when at least one sender is available.
    pub fn validate(&self) -> bool {
        if !self.is_email_defined() {
            warn!("no email sender configured, email notifications are disabled");
        }
        if !self.is_sms_defined() {
            warn!("no sms sender configured, sms notifications are disabled");
        }
        self.is_email_defined() || self.is_sms_defined()
    }

    pub fn send_email(&self, message: &EmailMessage) -> bool {
        let Some(sender) = &self.email else {
            warn!(to = %message.to, "could not send email, no email sender configured");
            return false;
        };

        if [&message.to, &message.from, &message.subject, &message.body]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            warn!(to = %message.to, "could not send email, to/from/subject/body must not be blank");
            return false;
        }

        // Blank cc/bcc mean "none".
        let message = EmailMessage {
            cc: message.cc.clone().filter(|cc| !cc.trim().is_empty()),
            bcc: message.bcc.clone().filter(|bcc| !bcc.trim().is_empty()),
            ..message.clone()
        };

        match sender.send(&message) {
            Ok(()) => {
                debug!(to = %message.to, "email sent");
                true
            }
            Err(err) => {
                error!(to = %message.to, "failed to send email: {err}");
                false
            }
        }
    }

    pub fn send_sms(&self, message: &SmsMessage) -> bool {
        let Some(sender) = &self.sms else {
            warn!(to = %message.to, "could not send sms, no sms sender configured");
            return false;
        };

        if [&message.from, &message.to, &message.body]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            warn!(to = %message.to, "could not send sms, from/to/body must not be blank");
            return false;
        }

        match sender.send(message) {
            Ok(()) => {
                debug!(to = %message.to, "sms sent");
                true
            }
            Err(err) => {
                error!(to = %message.to, "failed to send sms: {err}");
                false
            }
        }
    }
}

impl std::fmt::Debug for Communications {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Communications")
            .field("email", &self.is_email_defined())
            .field("sms", &self.is_sms_defined())
            .finish()
    }
}
