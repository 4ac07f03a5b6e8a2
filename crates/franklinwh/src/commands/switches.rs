//! Smart switch command handlers.

use franklinwh_core::{HttpCoordinator, SwitchState};

use crate::cli::{GlobalOpts, SwitchesArgs, SwitchesCommand};
use crate::error::CliError;

use super::util;

pub async fn handle(coordinator: &HttpCoordinator, args: SwitchesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        SwitchesCommand::Set {
            switch_1,
            switch_2,
            switch_3,
        } => {
            let state = SwitchState::new(switch_1.is_on(), switch_2.is_on(), switch_3.is_on());
            util::prepare(coordinator).await?;
            coordinator.set_switch_state(state).await?;
            if !global.quiet {
                eprintln!("Switches set to {}", util::switch_summary(state));
            }
            Ok(())
        }
    }
}
