//! Battery reserve command handlers.

use franklinwh_core::HttpCoordinator;

use crate::cli::{GlobalOpts, ReserveArgs, ReserveCommand};
use crate::error::CliError;

use super::util;

pub async fn handle(coordinator: &HttpCoordinator, args: ReserveArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ReserveCommand::Set { percent } => {
            util::prepare(coordinator).await?;
            coordinator.set_battery_reserve(percent).await?;
            if !global.quiet {
                eprintln!("Battery reserve set to {percent}%");
                if !coordinator.config().preserve_mode_on_reserve {
                    eprintln!("Note: the gateway is now in self-consumption mode");
                }
            }
            Ok(())
        }
    }
}
