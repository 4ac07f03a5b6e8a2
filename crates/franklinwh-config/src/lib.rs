//! Shared configuration for FranklinWH tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `franklinwh_core::CoordinatorConfig`. The CLI adds
//! flag-aware wrappers on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use franklinwh_core::{ApiTarget, CoordinatorConfig, Credentials, DEFAULT_MAX_FAILURES};

/// Keyring service name for stored passwords.
pub const KEYRING_SERVICE: &str = "franklinwh";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found in config")]
    ProfileNotFound { name: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named gateway profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_max_failures")]
    pub max_failures: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            max_failures: default_max_failures(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_max_failures() -> u32 {
    DEFAULT_MAX_FAILURES
}

/// A named gateway profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// FranklinWH account email.
    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// aGate serial number.
    pub gateway_id: String,

    /// Talk to the aGate on the local network instead of the cloud.
    #[serde(default)]
    pub use_local_api: bool,

    /// Host or URL of the aGate when `use_local_api` is set.
    pub local_host: Option<String>,

    /// Poll period in seconds. Defaults to 60 (cloud) or 10 (local).
    pub scan_interval: Option<u64>,

    /// Override the tolerated consecutive failures.
    pub max_failures: Option<u32>,

    /// Override the request timeout in seconds.
    pub timeout: Option<u64>,

    /// Keep the current mode when changing the battery reserve.
    #[serde(default)]
    pub preserve_mode_on_reserve: bool,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "franklinwh", "franklinwh").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("franklinwh");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Layered sources: built-in defaults, then the TOML file, then
/// `FRANKLINWH_*` environment variables (`__` separates nesting levels,
/// e.g. `FRANKLINWH_DEFAULTS__TIMEOUT`).
pub fn figment_for(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FRANKLINWH_").split("__"))
}

/// Extract a `Config` from an assembled figment.
pub fn extract_config(figment: &Figment) -> Result<Config, ConfigError> {
    Ok(figment.extract()?)
}

/// Load the full Config from file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    extract_config(&figment_for(&config_path()))
}

// ── Profile selection ───────────────────────────────────────────────

/// Pick a profile: the explicit name, else `default_profile`, else "default".
pub fn active_profile<'a>(
    cfg: &'a Config,
    name: Option<&str>,
) -> Result<(String, &'a Profile), ConfigError> {
    let name = name
        .map(str::to_owned)
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into());

    cfg.profiles
        .get(&name)
        .map(|p| (name.clone(), p))
        .ok_or(ConfigError::ProfileNotFound { name })
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve the account username: profile, then `FRANKLINWH_USERNAME`.
pub fn resolve_username(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    profile
        .username
        .clone()
        .or_else(|| std::env::var("FRANKLINWH_USERNAME").ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

/// Resolve the account password from the credential chain.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. Env var
    if let Ok(pw) = std::env::var("FRANKLINWH_PASSWORD") {
        return Ok(SecretString::from(pw));
    }

    // 3. Keyring
    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password")) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    // 4. Plaintext in config
    if let Some(ref pw) = profile.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a password in the system keyring for `profile_name`.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
        .and_then(|entry| entry.set_password(password))
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

/// Resolve the API target from `use_local_api` / `local_host`.
pub fn resolve_target(profile: &Profile) -> Result<ApiTarget, ConfigError> {
    if !profile.use_local_api {
        return Ok(ApiTarget::Cloud);
    }
    match profile.local_host.as_deref().map(str::trim) {
        Some(host) if !host.is_empty() => Ok(ApiTarget::Local { host: host.into() }),
        _ => Err(ConfigError::Validation {
            field: "local_host".into(),
            reason: "required when use_local_api is enabled".into(),
        }),
    }
}

/// Build a `CoordinatorConfig` from a profile -- no CLI flag overrides.
pub fn profile_to_coordinator_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<CoordinatorConfig, ConfigError> {
    if profile.gateway_id.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "gateway_id".into(),
            reason: "must not be empty".into(),
        });
    }

    let target = resolve_target(profile)?;
    let username = resolve_username(profile, profile_name)?;
    let password = resolve_password(profile, profile_name)?;

    let max_failures = profile.max_failures.unwrap_or(defaults.max_failures);
    if max_failures == 0 {
        return Err(ConfigError::Validation {
            field: "max_failures".into(),
            reason: "must be at least 1".into(),
        });
    }

    let mut config = CoordinatorConfig::new(
        Credentials::new(username, password, profile.gateway_id.trim()),
        target,
    );
    if let Some(secs) = profile.scan_interval {
        if secs == 0 {
            return Err(ConfigError::Validation {
                field: "scan_interval".into(),
                reason: "must be greater than zero".into(),
            });
        }
        config.scan_interval = Duration::from_secs(secs);
    }
    config.max_failures = max_failures;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.preserve_mode_on_reserve = profile.preserve_mode_on_reserve;

    Ok(config)
}
