//! CLI configuration -- thin wrapper around `franklinwh_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--gateway, --local-host, --timeout).

use std::time::Duration;

use franklinwh_core::{ApiTarget, CoordinatorConfig, DEFAULT_LOCAL_SCAN_INTERVAL};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use franklinwh_config::{Config, Profile, config_path, load_config, store_password};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Look up the active profile, listing the known ones when it is missing.
pub fn active_profile<'a>(global: &GlobalOpts, config: &'a Config) -> Result<(String, &'a Profile), CliError> {
    franklinwh_config::active_profile(config, global.profile.as_deref()).map_err(|e| match CliError::from(e) {
        CliError::ProfileNotFound { name, path, .. } => {
            let mut names: Vec<_> = config.profiles.keys().map(String::as_str).collect();
            names.sort_unstable();
            let available = if names.is_empty() {
                "(none)".into()
            } else {
                names.join(", ")
            };
            CliError::ProfileNotFound { name, available, path }
        }
        other => other,
    })
}

/// Translate the active profile + global flags into a `CoordinatorConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_coordinator_config(global: &GlobalOpts, config: &Config) -> Result<CoordinatorConfig, CliError> {
    let (name, profile) = active_profile(global, config)?;
    let mut resolved = franklinwh_config::profile_to_coordinator_config(profile, &name, &config.defaults)?;

    if let Some(ref gateway) = global.gateway {
        resolved.credentials.gateway_id.clone_from(gateway);
    }

    if let Some(ref host) = global.local_host {
        resolved.target = ApiTarget::Local { host: host.clone() };
        if profile.scan_interval.is_none() {
            resolved.scan_interval = DEFAULT_LOCAL_SCAN_INTERVAL;
        }
    }

    if let Some(secs) = global.timeout {
        resolved.timeout = Duration::from_secs(secs);
    }

    resolved.validate()?;
    Ok(resolved)
}
