use crate::cli::commands::risk;
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

pub const SUBCOMMAND: &str = "examine";
pub const ARG_ADDRESS: &str = "address";

#[derive(Debug, Clone)]
pub struct Options {
    pub address: String,
}

impl Options {
    /// Parse `examine` arguments from its subcommand matches.
    ///
    /// # Errors
    /// Returns an error if the address is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let address = matches
            .get_one::<String>(ARG_ADDRESS)
            .cloned()
            .context("missing required argument: <ADDRESS>")?;
        Ok(Self { address })
    }
}

#[must_use]
pub fn command() -> Command {
    let command = Command::new(SUBCOMMAND)
        .about("Examine one IP address with the risk gate and print the verdict as JSON")
        .arg(
            Arg::new(ARG_ADDRESS)
                .help("IPv4 or IPv6 address")
                .value_name("ADDRESS")
                .required(true),
        );

    risk::with_args(command)
}
