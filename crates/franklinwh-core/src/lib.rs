//! Polling coordinator for FranklinWH energy gateways.
//!
//! This crate sits between `franklinwh-api` and its consumers (the CLI or an
//! embedding automation host):
//!
//! - **[`Coordinator`]**: lazily builds the API client, polls the gateway on
//!   a fixed interval, and applies the failure policy. Short outages are
//!   absorbed by serving the last good [`GatewaySnapshot`]; authentication
//!   failures are surfaced immediately and suspend polling.
//!
//! - **Command forwarding**: [`Coordinator::set_switch_state`],
//!   [`Coordinator::set_operation_mode`] and
//!   [`Coordinator::set_battery_reserve`] forward user actions to the
//!   gateway, never mask their errors, and trigger a refresh on success.
//!
//! - **[`GatewayApi`] / [`ClientFactory`]**: the seam between the policy and
//!   the HTTP client, implemented for [`franklinwh_api::Client`].

pub mod config;
pub mod coordinator;
pub mod error;
pub mod gateway;
pub mod mode;
pub mod snapshot;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{
    Credentials, CoordinatorConfig, DEFAULT_LOCAL_SCAN_INTERVAL, DEFAULT_MAX_FAILURES, DEFAULT_SCAN_INTERVAL,
    DEFAULT_TIMEOUT,
};
pub use coordinator::{Coordinator, HttpCoordinator};
pub use error::CoreError;
pub use gateway::{ClientFactory, GatewayApi, HttpClientFactory};
pub use mode::OperationMode;
pub use snapshot::{CoordinatorState, GatewaySnapshot};

// API types that appear in this crate's public signatures.
pub use franklinwh_api::{ApiTarget, Current, Mode, ModeKind, Stats, SwitchState, Totals};
