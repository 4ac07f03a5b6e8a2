//! Operation mode command handlers.

use franklinwh_core::{CoreError, HttpCoordinator, OperationMode};

use crate::cli::{GlobalOpts, ModeArgs, ModeCommand};
use crate::error::CliError;

use super::util;

/// Reject unknown mode identifiers before any config or network work.
pub fn validate(mode: &str) -> Result<OperationMode, CliError> {
    mode.parse::<OperationMode>().map_err(|_| {
        CoreError::InvalidMode {
            mode: mode.to_owned(),
        }
        .into()
    })
}

pub async fn handle(coordinator: &HttpCoordinator, args: ModeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ModeCommand::Set { mode } => {
            util::prepare(coordinator).await?;
            coordinator.set_operation_mode(&mode).await?;
            if !global.quiet {
                eprintln!("Operation mode set to {mode}");
            }
            Ok(())
        }
    }
}
