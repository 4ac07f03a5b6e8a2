use thiserror::Error;

/// Top-level error type for the `franklinwh-api` crate.
///
/// Covers login, transport, and envelope-level failures reported by the
/// FranklinWH API. `franklinwh-core` decides which of these are transient.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected (wrong credentials, locked account, no token issued).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The login token was rejected by the API and could not be renewed.
    #[error("Login token expired -- re-authentication required")]
    TokenExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup error while building the HTTP client.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Non-success HTTP status. The body is kept for debugging but stays
    /// out of the message so proxy error pages are not mistaken for API text.
    #[error("HTTP error {status}")]
    Http { status: u16, body: String },

    // ── API ─────────────────────────────────────────────────────────
    /// Non-200 `code` in the `{code, message, result}` envelope.
    #[error("API error (code {code}): {message}")]
    Api { code: i64, message: String },

    /// The envelope was well-formed but a required payload was absent.
    #[error("Response carried no {0}")]
    MissingData(&'static str),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed. The raw body is kept for debugging only.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error means the credentials or token were
    /// rejected and retrying with the same credentials will not help.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::TokenExpired)
    }

    /// The message text the gateway itself sent, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Returns `true` for failures that may clear up on the next attempt
    /// (network trouble, gateway-side errors, partial responses).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::Http { .. }
                | Self::Api { .. }
                | Self::MissingData(_)
                | Self::Deserialization { .. }
        )
    }
}
