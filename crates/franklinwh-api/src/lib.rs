// franklinwh-api: Async Rust client for the FranklinWH aGate energy gateway API

pub mod auth;
pub mod client;
pub mod error;
pub mod mode;
pub mod models;
pub mod stats;
pub mod switches;
pub mod transport;

pub use auth::{ApiTarget, TokenFetcher};
pub use client::Client;
pub use error::Error;
pub use mode::{Mode, ModeKind};
pub use models::{Current, Stats, SwitchState, Totals};
pub use transport::{TlsMode, TransportConfig};
