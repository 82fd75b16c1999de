use crate::authn::TransactionRecord;
use crate::cli::commands::decide::Options;
use crate::config::DecisionConfig;
use crate::decision::DecisionOrchestrator;
use crate::notify::{Communications, LogEmailSender, LogSmsSender};
use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, instrument};

#[derive(Debug)]
pub struct Args {
    pub request: Options,
    pub config: DecisionConfig,
}

/// Build the transaction record described on the command line.
///
/// # Errors
/// Returns an error if credentials repeat or an outcome names an unknown or
/// already decided credential.
pub fn build_record(request: &Options) -> Result<TransactionRecord> {
    let mut record = TransactionRecord::new(request.origin.clone(), request.credentials.clone())
        .context("invalid --credential list")?;

    for (credential, success) in &request.successes {
        record
            .add_success(credential, success.clone())
            .context("invalid --success")?;
    }
    for (credential, failure) in &request.failures {
        record
            .add_failure(credential, failure.clone())
            .context("invalid --failure")?;
    }

    Ok(record)
}

/// Resolves on Ctrl-C; never resolves if the signal handler cannot be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Decide one attempt and print the decision.
///
/// # Errors
/// Returns an error if the configuration or the record is invalid, or if the
/// attempt is interrupted before a decision.
#[instrument(skip_all)]
pub async fn execute(args: Args) -> Result<ExitCode> {
    let communications = Communications::new()
        .with_email(Arc::new(LogEmailSender))
        .with_sms(Arc::new(LogSmsSender));

    let orchestrator = DecisionOrchestrator::from_config(&args.config, communications)
        .context("invalid decision configuration")?;
    debug!(
        policies = orchestrator.composer().len(),
        mode = %orchestrator.composer().mode(),
        risk_gating = orchestrator.gate().is_enabled(),
        "decision pipeline ready"
    );

    let record = build_record(&args.request)?;

    let decision = orchestrator
        .decide_or_cancel(&record, interrupted())
        .await
        .context("interrupted before a decision was reached")?;

    let shown = if args.request.privileged {
        decision.clone()
    } else {
        decision.redacted()
    };
    println!("{}", serde_json::to_string_pretty(&shown)?);
    eprintln!("{}", decision.describe(args.request.privileged));

    Ok(if decision.is_accepted() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
