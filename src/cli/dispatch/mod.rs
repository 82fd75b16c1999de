//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action for the chosen subcommand, with its
//! configuration fully assembled.

use crate::cli::actions::{decide, examine, Action};
use crate::cli::commands::{self, alert, policy, risk};
use crate::config::DecisionConfig;
use anyhow::{bail, Result};

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((commands::examine::SUBCOMMAND, sub)) => {
            let options = commands::examine::Options::parse(sub)?;
            Ok(Action::Examine(examine::Args {
                address: options.address,
                risk: risk::Options::parse(sub)?.into_config(),
            }))
        }
        Some((commands::decide::SUBCOMMAND, sub)) => {
            let request = commands::decide::Options::parse(sub)?;
            let config = DecisionConfig {
                auth: policy::Options::parse(sub)?.into_config(),
                risk: risk::Options::parse(sub)?.into_config(),
                alert: alert::Options::parse(sub)?.alert,
            };
            Ok(Action::Decide(decide::Args { request, config }))
        }
        Some((other, _)) => bail!("unknown subcommand: {other}"),
        None => bail!("missing subcommand"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAN_ENV: [(&str, Option<&str>); 4] = [
        ("AUTHGATE_BLACKDOT_CONTACT", None),
        ("AUTHGATE_POLICIES", None),
        ("AUTHGATE_ALERT_TO_EMAIL", None),
        ("AUTHGATE_ALERT_TO_PHONE", None),
    ];

    #[test]
    fn examine_builds_action() {
        temp_env::with_vars(CLEAN_ENV, || {
            let matches = commands::new().get_matches_from(vec![
                "authgate",
                "examine",
                "37.58.59.181",
                "--blackdot-contact",
                "cas@apereo.org",
            ]);
            let action = handler(&matches);
            assert!(action.is_ok_and(|action| matches!(
                action,
                Action::Examine(args) if args.address == "37.58.59.181" && args.risk.blackdot.is_some()
            )));
        });
    }

    #[test]
    fn decide_builds_action() {
        temp_env::with_vars(CLEAN_ENV, || {
            let matches = commands::new().get_matches_from(vec![
                "authgate",
                "decide",
                "--origin",
                "8.8.8.8",
                "--credential",
                "password",
                "--success",
                "password=alice@ldap",
                "--policy",
                "any",
            ]);
            let action = handler(&matches);
            assert!(action.is_ok_and(|action| matches!(
                action,
                Action::Decide(args) if args.config.auth.policies.len() == 1
                    && args.config.risk.blackdot.is_none()
                    && args.config.alert.is_none()
                    && !args.request.privileged
            )));
        });
    }

    #[test]
    fn decide_rejects_alert_without_sender() {
        temp_env::with_vars(
            [
                ("AUTHGATE_ALERT_TO_EMAIL", Some("ops@example.org")),
                ("AUTHGATE_ALERT_FROM", None),
            ],
            || {
                let matches = commands::new().get_matches_from(vec![
                    "authgate", "decide", "--origin", "8.8.8.8",
                ]);
                let result = handler(&matches);
                assert!(result.is_err_and(|err| err.to_string().contains("--alert-from")));
            },
        );
    }
}
