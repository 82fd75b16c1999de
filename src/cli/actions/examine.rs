use crate::config::RiskConfig;
use crate::risk::RiskGate;
use anyhow::{Context, Result};
use std::process::ExitCode;
use tracing::{info, instrument};

#[derive(Debug)]
pub struct Args {
    pub address: String,
    pub risk: RiskConfig,
}

/// Run the risk gate once and print the verdict.
///
/// # Errors
/// Returns an error if the configuration is invalid or the address is malformed.
#[instrument(skip_all, fields(address = %args.address))]
pub async fn execute(args: Args) -> Result<ExitCode> {
    let gate = RiskGate::from_config(&args.risk).context("invalid risk gating configuration")?;
    if !gate.is_enabled() {
        info!("no BlackDot contact configured, risk gating disabled");
    }

    let verdict = gate.examine(&args.address).await?;

    println!("{}", serde_json::to_string_pretty(&verdict)?);

    Ok(if verdict.is_banned() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
