use crate::cli::actions::{decide, examine, Action};
use anyhow::Result;
use std::process::ExitCode;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<ExitCode> {
    match action {
        Action::Examine(args) => examine::execute(args).await,
        Action::Decide(args) => decide::execute(args).await,
    }
}
