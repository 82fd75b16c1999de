use anyhow::Result;
use authgate::cli::{self, telemetry};
use std::process::ExitCode;

// Main function
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let action = cli::start()?;

    let result = action.execute().await;

    telemetry::shutdown_tracer();

    result
}
