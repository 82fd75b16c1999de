pub mod decide;
pub mod examine;

// Internal "interpreter" for `Action`.
mod run;

use std::process::ExitCode;

#[derive(Debug)]
pub enum Action {
    Examine(examine::Args),
    Decide(decide::Args),
}

impl Action {
    /// Execute the action and report the process exit status: success when the
    /// address is not banned or the attempt is accepted.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<ExitCode> {
        run::execute(self).await
    }
}
