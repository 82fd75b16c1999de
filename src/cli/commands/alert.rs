use crate::config::{AlertConfig, DEFAULT_ALERT_SUBJECT};
use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

pub const ARG_ALERT_FROM: &str = "alert-from";
pub const ARG_ALERT_TO_EMAIL: &str = "alert-to-email";
pub const ARG_ALERT_TO_PHONE: &str = "alert-to-phone";
pub const ARG_ALERT_SUBJECT: &str = "alert-subject";

#[derive(Debug, Clone)]
pub struct Options {
    pub alert: Option<AlertConfig>,
}

impl Options {
    /// Parse operator alert arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a recipient is configured without a sender.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let to_email = get_non_empty(ARG_ALERT_TO_EMAIL);
        let to_phone = get_non_empty(ARG_ALERT_TO_PHONE);
        if to_email.is_none() && to_phone.is_none() {
            return Ok(Self { alert: None });
        }

        let Some(from) = get_non_empty(ARG_ALERT_FROM) else {
            anyhow::bail!("missing required argument: --{ARG_ALERT_FROM} (required when an alert recipient is set)");
        };

        Ok(Self {
            alert: Some(AlertConfig {
                from,
                to_email,
                to_phone,
                subject: get_non_empty(ARG_ALERT_SUBJECT)
                    .unwrap_or_else(|| DEFAULT_ALERT_SUBJECT.to_string()),
            }),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ALERT_FROM)
                .long(ARG_ALERT_FROM)
                .help("Sender used for risk alerts")
                .env("AUTHGATE_ALERT_FROM"),
        )
        .arg(
            Arg::new(ARG_ALERT_TO_EMAIL)
                .long(ARG_ALERT_TO_EMAIL)
                .help("E-mail address notified when an attempt is rejected as banned")
                .env("AUTHGATE_ALERT_TO_EMAIL"),
        )
        .arg(
            Arg::new(ARG_ALERT_TO_PHONE)
                .long(ARG_ALERT_TO_PHONE)
                .help("Phone number notified by SMS when an attempt is rejected as banned")
                .env("AUTHGATE_ALERT_TO_PHONE"),
        )
        .arg(
            Arg::new(ARG_ALERT_SUBJECT)
                .long(ARG_ALERT_SUBJECT)
                .help("Subject of the alert e-mail")
                .env("AUTHGATE_ALERT_SUBJECT")
                .default_value(DEFAULT_ALERT_SUBJECT),
        )
}
