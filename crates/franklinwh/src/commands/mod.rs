//! Command dispatch: bridges CLI args -> coordinator calls -> output formatting.

pub mod config_cmd;
pub mod mode;
pub mod reserve;
pub mod status;
pub mod switches;
pub mod util;
pub mod watch;

use franklinwh_core::HttpCoordinator;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a gateway-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, coordinator: &HttpCoordinator, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Status => status::handle(coordinator, global).await,
        Command::Watch(_) => watch::handle(coordinator, global).await,
        Command::Switches(args) => switches::handle(coordinator, args, global).await,
        Command::Mode(args) => mode::handle(coordinator, args, global).await,
        Command::Reserve(args) => reserve::handle(coordinator, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "does not talk to a gateway".into(),
        }),
    }
}
