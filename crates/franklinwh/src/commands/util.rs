//! Shared helpers for command handlers.

use franklinwh_core::{CoreError, HttpCoordinator, SwitchState};
use tracing::warn;

use crate::error::CliError;

/// Run a first refresh so the coordinator holds a logged-in client.
///
/// A gateway that answers login but not the stats query still leaves a
/// usable client behind, so commands can go ahead.
pub async fn prepare(coordinator: &HttpCoordinator) -> Result<(), CliError> {
    match coordinator.refresh().await {
        Ok(_) => Ok(()),
        Err(CoreError::Communication { message }) => {
            warn!(%message, "initial refresh failed, continuing");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// `on / off / on`
pub fn switch_summary(state: SwitchState) -> String {
    state
        .0
        .iter()
        .map(|on| if *on { "on" } else { "off" })
        .collect::<Vec<_>>()
        .join(" / ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_summary_lists_all_three() {
        assert_eq!(switch_summary(SwitchState::new(true, false, true)), "on / off / on");
        assert_eq!(switch_summary(SwitchState::default()), "off / off / off");
    }
}
