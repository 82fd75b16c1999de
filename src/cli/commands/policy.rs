use crate::authn::{CompositionMode, FailureCause, PolicySpec};
use crate::config::AuthConfig;
use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::collections::HashSet;

pub const ARG_POLICY: &str = "policy";
pub const ARG_COMPOSITION: &str = "composition";
pub const ARG_TRY_ALL: &str = "try-all";
pub const ARG_REQUIRED_HANDLER: &str = "required-handler";
pub const ARG_DISQUALIFYING: &str = "disqualifying-cause";
pub const ARG_REQUIRE_POLICY: &str = "require-policy";

#[derive(Debug, Clone)]
pub struct Options {
    pub composition: CompositionMode,
    pub policies: Vec<PolicySpec>,
    pub require_policy: bool,
}

impl Options {
    /// Parse policy arguments from matches.
    ///
    /// # Errors
    /// Returns an error for unknown policy names, composition modes or failure causes.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let composition = matches
            .get_one::<String>(ARG_COMPOSITION)
            .map(|mode| mode.parse::<CompositionMode>())
            .transpose()
            .with_context(|| format!("invalid --{ARG_COMPOSITION}"))?
            .unwrap_or_default();

        let disqualifying = matches
            .get_many::<String>(ARG_DISQUALIFYING)
            .map(|causes| {
                causes
                    .map(|cause| cause.parse::<FailureCause>())
                    .collect::<Result<HashSet<_>, _>>()
            })
            .transpose()
            .with_context(|| format!("invalid --{ARG_DISQUALIFYING}"))?;

        let try_all = matches.get_flag(ARG_TRY_ALL);
        let handler = matches
            .get_one::<String>(ARG_REQUIRED_HANDLER)
            .map(String::as_str);

        let policies = matches
            .get_many::<String>(ARG_POLICY)
            .into_iter()
            .flatten()
            .filter(|name| !name.trim().is_empty())
            .map(|name| PolicySpec::named(name, try_all, handler, disqualifying.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("invalid --{ARG_POLICY}"))?;

        Ok(Self {
            composition,
            policies,
            require_policy: matches.get_flag(ARG_REQUIRE_POLICY),
        })
    }

    #[must_use]
    pub fn into_config(self) -> AuthConfig {
        AuthConfig {
            composition: self.composition,
            policies: self.policies,
            require_policy: self.require_policy,
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_POLICY)
                .long(ARG_POLICY)
                .help("Authentication policy to apply, repeatable: any, all, not-prevented, required-handler")
                .long_help(
                    "Authentication policy to apply. Repeat the flag or separate names with commas.\n\nWithout any policy the attempt is accepted once the risk gate lets it through, unless --require-policy is set.",
                )
                .env("AUTHGATE_POLICIES")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new(ARG_COMPOSITION)
                .long(ARG_COMPOSITION)
                .help("How policies combine: require-all or require-any")
                .env("AUTHGATE_COMPOSITION")
                .default_value("require-all"),
        )
        .arg(
            Arg::new(ARG_TRY_ALL)
                .long(ARG_TRY_ALL)
                .help("Require an outcome for every submitted credential")
                .env("AUTHGATE_TRY_ALL")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_REQUIRED_HANDLER)
                .long(ARG_REQUIRED_HANDLER)
                .help("Handler that must have produced a success (required-handler policy)")
                .env("AUTHGATE_REQUIRED_HANDLER"),
        )
        .arg(
            Arg::new(ARG_DISQUALIFYING)
                .long(ARG_DISQUALIFYING)
                .help("Failure cause that vetoes the attempt (not-prevented policy), repeatable")
                .long_help(
                    "Failure cause that vetoes the attempt under the not-prevented policy.\n\nDefaults to account-locked, account-disabled and credential-expired.",
                )
                .env("AUTHGATE_DISQUALIFYING_CAUSES")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new(ARG_REQUIRE_POLICY)
                .long(ARG_REQUIRE_POLICY)
                .help("Refuse to run without at least one policy")
                .env("AUTHGATE_REQUIRE_POLICY")
                .action(ArgAction::SetTrue),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options> {
        let command = with_args(Command::new("test"));
        let matches = command.try_get_matches_from(std::iter::once("test").chain(args.iter().copied()))?;
        Options::parse(&matches)
    }

    #[test]
    fn defaults_to_no_policy() -> Result<()> {
        temp_env::with_vars(
            [
                ("AUTHGATE_POLICIES", None::<&str>),
                ("AUTHGATE_COMPOSITION", None),
            ],
            || {
                let options = parse(&[])?;
                assert!(options.policies.is_empty());
                assert_eq!(options.composition, CompositionMode::RequireAll);
                assert!(!options.require_policy);
                Ok(())
            },
        )
    }

    #[test]
    fn builds_specs_from_flags() -> Result<()> {
        let options = parse(&[
            "--policy",
            "any,not-prevented",
            "--policy",
            "required-handler",
            "--required-handler",
            "ldap",
            "--try-all",
            "--composition",
            "require-any",
            "--disqualifying-cause",
            "account_locked",
        ])?;

        assert_eq!(options.composition, CompositionMode::RequireAny);
        assert_eq!(
            options.policies,
            vec![
                PolicySpec::Any { try_all: true },
                PolicySpec::NotPrevented {
                    try_all: true,
                    disqualifying: Some(HashSet::from([FailureCause::AccountLocked])),
                },
                PolicySpec::RequiredHandler {
                    handler: "ldap".to_string(),
                    try_all: true,
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn reads_environment() {
        temp_env::with_vars(
            [
                ("AUTHGATE_POLICIES", Some("all")),
                ("AUTHGATE_COMPOSITION", Some("any")),
                ("AUTHGATE_REQUIRE_POLICY", Some("true")),
            ],
            || {
                let options = parse(&[]);
                assert!(options.is_ok_and(|o| o.policies == vec![PolicySpec::All]
                    && o.composition == CompositionMode::RequireAny
                    && o.require_policy));
            },
        );
    }

    #[test]
    fn rejects_unknown_names() {
        let err = parse(&["--policy", "majority"]).err().map(|e| format!("{e:#}"));
        assert!(err.is_some_and(|e| e.contains("unknown policy: majority")));

        let err = parse(&["--policy", "any", "--disqualifying-cause", "sunspots"])
            .err()
            .map(|e| format!("{e:#}"));
        assert!(err.is_some_and(|e| e.contains("unknown failure cause")));

        assert!(parse(&["--composition", "most"]).is_err());
        assert!(parse(&["--policy", "required-handler"]).is_err());
    }
}
