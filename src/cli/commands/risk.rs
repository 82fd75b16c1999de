use crate::config::{
    BlackDotConfig, RiskConfig, DEFAULT_BLACKDOT_URL, DEFAULT_CACHE_CAPACITY, DEFAULT_TIMEOUT_MS,
};
use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_BLACKDOT_CONTACT: &str = "blackdot-contact";
pub const ARG_BLACKDOT_URL: &str = "blackdot-url";
pub const ARG_BLACKDOT_FLAGS: &str = "blackdot-flags";
pub const ARG_BAN_THRESHOLD: &str = "ban-threshold";
pub const ARG_RISK_TIMEOUT_MS: &str = "risk-timeout-ms";
pub const ARG_RISK_MONITOR_ONLY: &str = "risk-monitor-only";
pub const ARG_RISK_CACHE_TTL: &str = "risk-cache-ttl-seconds";
pub const ARG_RISK_CACHE_CAPACITY: &str = "risk-cache-capacity";

#[derive(Debug, Clone)]
pub struct Options {
    pub contact: Option<SecretString>,
    pub url: String,
    pub flags: Option<String>,
    pub ban_threshold: f64,
    pub timeout_ms: u64,
    pub monitor_only: bool,
    pub cache_ttl_seconds: u64,
    pub cache_capacity: usize,
}

impl Options {
    /// Parse risk gating arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the ban threshold is outside `(0, 1]`.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let ban_threshold = matches
            .get_one::<f64>(ARG_BAN_THRESHOLD)
            .copied()
            .unwrap_or(1.0);
        if !(ban_threshold > 0.0 && ban_threshold <= 1.0) {
            anyhow::bail!("invalid --{ARG_BAN_THRESHOLD}: {ban_threshold}");
        }

        Ok(Self {
            contact: get_non_empty(ARG_BLACKDOT_CONTACT).map(SecretString::from),
            url: get_non_empty(ARG_BLACKDOT_URL).unwrap_or_else(|| DEFAULT_BLACKDOT_URL.to_string()),
            flags: get_non_empty(ARG_BLACKDOT_FLAGS),
            ban_threshold,
            timeout_ms: matches
                .get_one::<u64>(ARG_RISK_TIMEOUT_MS)
                .copied()
                .unwrap_or(DEFAULT_TIMEOUT_MS),
            monitor_only: matches.get_flag(ARG_RISK_MONITOR_ONLY),
            cache_ttl_seconds: matches
                .get_one::<u64>(ARG_RISK_CACHE_TTL)
                .copied()
                .unwrap_or(0),
            cache_capacity: matches
                .get_one::<usize>(ARG_RISK_CACHE_CAPACITY)
                .copied()
                .unwrap_or(DEFAULT_CACHE_CAPACITY),
        })
    }

    /// Risk configuration; without a contact no source is configured and the gate
    /// is disabled.
    #[must_use]
    pub fn into_config(self) -> RiskConfig {
        let blackdot = self.contact.map(|contact| BlackDotConfig {
            url: self.url,
            contact,
            flags: self.flags,
            ban_threshold: self.ban_threshold,
        });

        RiskConfig {
            enforcing: !self.monitor_only,
            timeout_ms: self.timeout_ms,
            blackdot,
            cache_ttl_seconds: self.cache_ttl_seconds,
            cache_capacity: self.cache_capacity,
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BLACKDOT_CONTACT)
                .long(ARG_BLACKDOT_CONTACT)
                .help("Contact e-mail sent to the BlackDot service; risk gating is disabled without it")
                .env("AUTHGATE_BLACKDOT_CONTACT")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_BLACKDOT_URL)
                .long(ARG_BLACKDOT_URL)
                .help("BlackDot (getipintel) check endpoint")
                .env("AUTHGATE_BLACKDOT_URL")
                .default_value(DEFAULT_BLACKDOT_URL),
        )
        .arg(
            Arg::new(ARG_BLACKDOT_FLAGS)
                .long(ARG_BLACKDOT_FLAGS)
                .help("BlackDot lookup flags, for example: m, b or f")
                .env("AUTHGATE_BLACKDOT_FLAGS"),
        )
        .arg(
            Arg::new(ARG_BAN_THRESHOLD)
                .long(ARG_BAN_THRESHOLD)
                .help("Scores at or above this value ban the address")
                .env("AUTHGATE_BAN_THRESHOLD")
                .default_value("1.0")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new(ARG_RISK_TIMEOUT_MS)
                .long(ARG_RISK_TIMEOUT_MS)
                .help("Upper bound for one reputation lookup, in milliseconds")
                .env("AUTHGATE_RISK_TIMEOUT_MS")
                .default_value("5000")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_RISK_MONITOR_ONLY)
                .long(ARG_RISK_MONITOR_ONLY)
                .help("Log banned addresses instead of rejecting them")
                .env("AUTHGATE_RISK_MONITOR_ONLY")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_RISK_CACHE_TTL)
                .long(ARG_RISK_CACHE_TTL)
                .help("Cache definitive verdicts for this many seconds (0 disables the cache)")
                .env("AUTHGATE_RISK_CACHE_TTL_SECONDS")
                .default_value("0")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_RISK_CACHE_CAPACITY)
                .long(ARG_RISK_CACHE_CAPACITY)
                .help("Maximum number of cached verdicts")
                .env("AUTHGATE_RISK_CACHE_CAPACITY")
                .default_value("1024")
                .value_parser(clap::value_parser!(usize)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::time::Duration;

    fn parse(args: &[&str]) -> Result<Options> {
        let command = with_args(Command::new("test"));
        let matches =
            command.try_get_matches_from(std::iter::once("test").chain(args.iter().copied()))?;
        Options::parse(&matches)
    }

    #[test]
    fn no_contact_disables_the_gate() {
        temp_env::with_vars([("AUTHGATE_BLACKDOT_CONTACT", None::<&str>)], || {
            let config = parse(&[]).map(Options::into_config);
            assert!(config.is_ok_and(|c| c.blackdot.is_none()
                && c.enforcing
                && c.timeout_ms == DEFAULT_TIMEOUT_MS
                && c.cache_ttl().is_none()));
        });
    }

    #[test]
    fn flags_build_blackdot_config() -> Result<()> {
        let config = parse(&[
            "--blackdot-contact",
            "cas@apereo.org",
            "--blackdot-url",
            "http://127.0.0.1:9000/check.php",
            "--blackdot-flags",
            "m",
            "--ban-threshold",
            "0.99",
            "--risk-timeout-ms",
            "250",
            "--risk-monitor-only",
            "--risk-cache-ttl-seconds",
            "60",
        ])?
        .into_config();

        assert!(!config.enforcing);
        assert_eq!(config.timeout()?, Duration::from_millis(250));
        assert_eq!(config.cache_ttl(), Some(Duration::from_secs(60)));

        let blackdot = config
            .blackdot
            .ok_or_else(|| anyhow::anyhow!("blackdot config missing"))?;
        assert_eq!(blackdot.contact.expose_secret(), "cas@apereo.org");
        assert_eq!(blackdot.url, "http://127.0.0.1:9000/check.php");
        assert_eq!(blackdot.flags.as_deref(), Some("m"));
        assert!((blackdot.ban_threshold - 0.99).abs() < f64::EPSILON);
        Ok(())
    }

    #[test]
    fn contact_from_environment() {
        temp_env::with_vars(
            [
                ("AUTHGATE_BLACKDOT_CONTACT", Some("cas@apereo.org")),
                ("AUTHGATE_RISK_TIMEOUT_MS", Some("750")),
            ],
            || {
                let config = parse(&[]).map(Options::into_config);
                assert!(config.is_ok_and(|c| c.timeout_ms == 750
                    && c.blackdot
                        .is_some_and(|b| b.contact.expose_secret() == "cas@apereo.org")));
            },
        );
    }

    #[test]
    fn zero_timeout_is_refused() {
        assert!(parse(&["--risk-timeout-ms", "0"]).is_err());
    }

    #[test]
    fn ban_threshold_outside_unit_range_is_refused() {
        assert!(parse(&["--ban-threshold", "0"]).is_err());
        assert!(parse(&["--ban-threshold", "1.5"]).is_err());
        assert!(parse(&["--ban-threshold", "1"]).is_ok());
    }
}
