// Published coordinator data and health state.

use chrono::{DateTime, Utc};
use franklinwh_api::{Stats, SwitchState};
use serde::Serialize;
use strum::Display;

/// Last known-good gateway data. Replaced wholesale on each successful
/// refresh and shared as `Arc<GatewaySnapshot>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewaySnapshot {
    pub stats: Stats,
    pub switch_state: SwitchState,
    pub fetched_at: DateTime<Utc>,
}

impl GatewaySnapshot {
    pub fn new(stats: Stats, switch_state: SwitchState) -> Self {
        Self {
            stats,
            switch_state,
            fetched_at: Utc::now(),
        }
    }
}

/// Health of the refresh loop, observable through a `watch` channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum CoordinatorState {
    /// No successful refresh yet.
    #[strum(to_string = "uninitialized")]
    Uninitialized,
    #[strum(to_string = "healthy")]
    Healthy,
    /// `failures` consecutive transient errors, still below the threshold.
    /// Cached data is served when there is any.
    #[strum(to_string = "degraded ({failures} consecutive failures)")]
    Degraded { failures: u32 },
    /// Failure threshold reached; cached data is no longer served.
    #[strum(to_string = "unavailable")]
    Unavailable,
    /// Credentials rejected. Polling is suspended until re-authentication.
    #[strum(to_string = "authentication failed")]
    AuthFailed,
}

