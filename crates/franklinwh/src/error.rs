//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use franklinwh_config::ConfigError;
use franklinwh_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the FranklinWH API: {message}")]
    #[diagnostic(
        code(franklinwh::connection_failed),
        help(
            "Check network access to energy.franklinwh.com, or to the aGate when\n\
             using --local-host. Re-run with -vv for request logs."
        )
    )]
    ConnectionFailed { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(franklinwh::auth_failed),
        help(
            "Verify the account email and password for profile '{profile}'.\n\
             Run: franklinwh config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(franklinwh::no_credentials),
        help(
            "Set username and password in the profile, store the password with\n\
             franklinwh config set-password, or set FRANKLINWH_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Commands ─────────────────────────────────────────────────────
    #[error("Failed to {operation}: {message}")]
    #[diagnostic(code(franklinwh::command_failed))]
    CommandFailed { operation: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(franklinwh::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(franklinwh::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Add a [profiles.{name}] section to {path}"
        )
    )]
    ProfileNotFound {
        name: String,
        available: String,
        path: String,
    },

    #[error(transparent)]
    #[diagnostic(code(franklinwh::config))]
    Config(Box<figment::Error>),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(franklinwh::render))]
    Render(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the active profile name to auth failures.
    pub fn with_profile(self, profile: &str) -> Self {
        match self {
            Self::AuthFailed { message, .. } => Self::AuthFailed {
                profile: profile.into(),
                message,
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ClientInit { message } | CoreError::Communication { message } => {
                CliError::ConnectionFailed { message }
            }

            CoreError::ClientNotReady => CliError::ConnectionFailed {
                message: "no client available".into(),
            },

            CoreError::AuthFailed { message } => CliError::AuthFailed {
                profile: "default".into(),
                message,
            },

            CoreError::InvalidMode { mode } => CliError::Validation {
                field: "mode".into(),
                reason: format!("'{mode}' is not one of self_use, backup, time_of_use, clean_backup"),
            },

            CoreError::InvalidReserve { reserve } => CliError::Validation {
                field: "reserve".into(),
                reason: format!("{reserve} is outside 0-100"),
            },

            CoreError::CommandFailed { operation, source } => CliError::CommandFailed {
                operation: operation.into(),
                message: source.to_string(),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
                path: franklinwh_config::config_path().display().to_string(),
            },
            ConfigError::Figment(e) => CliError::Config(e),
        }
    }
}
