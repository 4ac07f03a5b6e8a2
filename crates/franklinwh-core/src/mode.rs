// User-facing operation modes.
//
// Four identifiers map onto the gateway's three work modes. `clean_backup`
// has no counterpart on the gateway and is sent as emergency backup.

use franklinwh_api::Mode;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, VariantNames};

/// Operation mode as requested by a user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationMode {
    SelfUse,
    Backup,
    TimeOfUse,
    CleanBackup,
}

impl OperationMode {
    /// The gateway mode this selects, with that mode's default reserve.
    pub fn to_mode(self) -> Mode {
        match self {
            Self::SelfUse => Mode::self_consumption(None),
            Self::Backup | Self::CleanBackup => Mode::emergency_backup(None),
            Self::TimeOfUse => Mode::time_of_use(None),
        }
    }
}
