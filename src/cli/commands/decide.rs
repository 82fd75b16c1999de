use crate::authn::{AuthenticationFailure, AuthenticationSuccess, Credential, FailureCause};
use crate::cli::commands::{alert, policy, risk};
use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};

pub const SUBCOMMAND: &str = "decide";
pub const ARG_ORIGIN: &str = "origin";
pub const ARG_CREDENTIAL: &str = "credential";
pub const ARG_SUCCESS: &str = "success";
pub const ARG_FAILURE: &str = "failure";
pub const ARG_PRIVILEGED: &str = "privileged";

/// Handler recorded when an outcome does not name one.
pub const DEFAULT_HANDLER: &str = "cli";

#[derive(Debug, Clone)]
pub struct Options {
    pub origin: String,
    pub credentials: Vec<Credential>,
    pub successes: Vec<(Credential, AuthenticationSuccess)>,
    pub failures: Vec<(Credential, AuthenticationFailure)>,
    pub privileged: bool,
}

impl Options {
    /// Parse `decide` arguments from its subcommand matches.
    ///
    /// # Errors
    /// Returns an error if the origin is missing or an outcome is malformed.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let origin = matches
            .get_one::<String>(ARG_ORIGIN)
            .cloned()
            .context("missing required argument: --origin")?;

        let values = |id: &str| {
            matches
                .get_many::<String>(id)
                .into_iter()
                .flatten()
                .map(String::as_str)
        };

        let successes = values(ARG_SUCCESS)
            .map(parse_success)
            .collect::<Result<Vec<_>>>()?;
        let failures = values(ARG_FAILURE)
            .map(parse_failure)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            origin,
            credentials: values(ARG_CREDENTIAL).map(Credential::from).collect(),
            successes,
            failures,
            privileged: matches.get_flag(ARG_PRIVILEGED),
        })
    }
}

/// Split `ID=VALUE[@HANDLER]`; the handler is whatever follows the last `@`.
fn split_outcome<'a>(flag: &str, raw: &'a str) -> Result<(&'a str, &'a str, &'a str)> {
    let (id, rest) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("invalid --{flag} {raw:?}: expected ID=VALUE[@HANDLER]"))?;
    let (value, handler) = rest.rsplit_once('@').unwrap_or((rest, DEFAULT_HANDLER));
    let (id, value, handler) = (id.trim(), value.trim(), handler.trim());

    if id.is_empty() || value.is_empty() || handler.is_empty() {
        return Err(anyhow!(
            "invalid --{flag} {raw:?}: credential, value and handler must not be blank"
        ));
    }
    Ok((id, value, handler))
}

/// Parse `ID=PRINCIPAL[@HANDLER]`.
///
/// # Errors
/// Returns an error if the value is malformed.
pub fn parse_success(raw: &str) -> Result<(Credential, AuthenticationSuccess)> {
    let (id, principal, handler) = split_outcome(ARG_SUCCESS, raw)?;
    Ok((
        Credential::new(id),
        AuthenticationSuccess::new(principal, handler),
    ))
}

/// Parse `ID=CAUSE[@HANDLER]`.
///
/// # Errors
/// Returns an error if the value is malformed or the cause is unknown.
pub fn parse_failure(raw: &str) -> Result<(Credential, AuthenticationFailure)> {
    let (id, cause, handler) = split_outcome(ARG_FAILURE, raw)?;
    let cause = cause
        .parse::<FailureCause>()
        .with_context(|| format!("invalid --{ARG_FAILURE} {raw:?}"))?;
    Ok((
        Credential::new(id),
        AuthenticationFailure::new(handler, cause),
    ))
}

#[must_use]
pub fn command() -> Command {
    let command = Command::new(SUBCOMMAND)
        .about("Decide one authentication attempt and print the decision as JSON")
        .arg(
            Arg::new(ARG_ORIGIN)
                .long(ARG_ORIGIN)
                .help("Address the attempt originated from")
                .value_name("ADDRESS")
                .required(true),
        )
        .arg(
            Arg::new(ARG_CREDENTIAL)
                .long(ARG_CREDENTIAL)
                .help("Submitted credential id, in submission order (repeatable)")
                .value_name("ID")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new(ARG_SUCCESS)
                .long(ARG_SUCCESS)
                .help("Successful validation of a submitted credential (repeatable)")
                .value_name("ID=PRINCIPAL[@HANDLER]")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new(ARG_FAILURE)
                .long(ARG_FAILURE)
                .help("Failed validation of a submitted credential (repeatable)")
                .long_help(
                    "Failed validation of a submitted credential (repeatable).\n\nCAUSE is one of: invalid-credential, account-not-found, account-locked, account-disabled, credential-expired, password-must-change, invalid-login-location, invalid-login-hours, other.",
                )
                .value_name("ID=CAUSE[@HANDLER]")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new(ARG_PRIVILEGED)
                .long(ARG_PRIVILEGED)
                .help("Include diagnostic detail in the printed decision")
                .action(ArgAction::SetTrue),
        );

    let command = policy::with_args(command);
    let command = risk::with_args(command);
    alert::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_success_with_and_without_handler() -> Result<()> {
        let (id, success) = parse_success("password=alice@ldap")?;
        assert_eq!(id, Credential::new("password"));
        assert_eq!(success.principal, "alice");
        assert_eq!(success.handler, "ldap");

        let (_, success) = parse_success("otp=bob")?;
        assert_eq!(success.handler, DEFAULT_HANDLER);

        let (_, success) = parse_success("x509=alice@example.org@pki")?;
        assert_eq!(success.principal, "alice@example.org");
        assert_eq!(success.handler, "pki");
        Ok(())
    }

    #[test]
    fn parses_failure_cause() -> Result<()> {
        let (id, failure) = parse_failure("password=account_locked@ldap")?;
        assert_eq!(id, Credential::new("password"));
        assert_eq!(failure.cause, FailureCause::AccountLocked);
        assert_eq!(failure.handler, "ldap");
        Ok(())
    }

    #[test]
    fn rejects_malformed_outcomes() {
        assert!(parse_success("password").is_err());
        assert!(parse_success("=alice").is_err());
        assert!(parse_success("password=@ldap").is_err());
        assert!(parse_failure("password=sunspots").is_err());
    }

    #[test]
    fn parses_subcommand() -> Result<()> {
        let matches = command().try_get_matches_from(vec![
            SUBCOMMAND,
            "--origin",
            "203.0.113.7",
            "--credential",
            "password",
            "--credential",
            "otp",
            "--success",
            "password=alice@ldap",
            "--failure",
            "otp=invalid-credential",
            "--privileged",
        ])?;
        let options = Options::parse(&matches)?;

        assert_eq!(options.origin, "203.0.113.7");
        assert_eq!(
            options.credentials,
            vec![Credential::new("password"), Credential::new("otp")]
        );
        assert_eq!(options.successes.len(), 1);
        assert_eq!(options.failures.len(), 1);
        assert!(options.privileged);
        Ok(())
    }

    #[test]
    fn origin_is_required() {
        assert!(command().try_get_matches_from(vec![SUBCOMMAND]).is_err());
    }
}
