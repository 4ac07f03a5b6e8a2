use thiserror::Error;

/// Errors surfaced by the coordinator to its consumers.
///
/// Fetch-path errors (`ClientInit`, `Communication`) may clear up on a later
/// refresh cycle. `AuthFailed` stops background polling until new
/// credentials are supplied. Command-path errors are always returned to the
/// caller and never masked by cached data.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Refresh path ────────────────────────────────────────────────
    /// Building the API client failed. Retried on the next cycle.
    #[error("Failed to initialize client: {message}")]
    ClientInit { message: String },

    /// A command was issued before the first client was built.
    #[error("FranklinWH client is not initialized -- no successful refresh yet")]
    ClientNotReady,

    /// Credentials or token were rejected.
    #[error("Authentication failed: {message}")]
    AuthFailed { message: String },

    /// The gateway could not be reached or returned no data, and the
    /// cached snapshot cannot (or may no longer) stand in for it.
    #[error("Error communicating with API: {message}")]
    Communication { message: String },

    // ── Command path ────────────────────────────────────────────────
    #[error("Invalid mode: {mode}")]
    InvalidMode { mode: String },

    #[error("Invalid battery reserve {reserve}% -- must be between 0 and 100")]
    InvalidReserve { reserve: u8 },

    /// The gateway rejected or failed a user-initiated command.
    #[error("Failed to {operation}: {source}")]
    CommandFailed {
        operation: &'static str,
        #[source]
        source: franklinwh_api::Error,
    },

    // ── Configuration ───────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// `true` when new credentials are needed before anything will work.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::AuthFailed { .. })
    }
}
