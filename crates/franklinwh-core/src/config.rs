// Coordinator configuration
//
// Built by `franklinwh-config` from a profile, or directly by embedders.

use std::fmt;
use std::time::Duration;

use franklinwh_api::ApiTarget;
use secrecy::SecretString;

use crate::error::CoreError;

/// Poll period when talking to the cloud API.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(60);
/// Poll period when talking to an aGate on the local network.
pub const DEFAULT_LOCAL_SCAN_INTERVAL: Duration = Duration::from_secs(10);
/// Consecutive transient failures tolerated before data is marked unavailable.
pub const DEFAULT_MAX_FAILURES: u32 = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Account credentials and the gateway they control.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    /// aGate serial number.
    pub gateway_id: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString, gateway_id: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password,
            gateway_id: gateway_id.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("gateway_id", &self.gateway_id)
            .finish()
    }
}

/// Everything a [`Coordinator`](crate::Coordinator) needs to poll one gateway.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub credentials: Credentials,
    pub target: ApiTarget,
    pub scan_interval: Duration,
    pub max_failures: u32,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Keep the current mode kind when changing the battery reserve instead
    /// of switching to self-consumption.
    pub preserve_mode_on_reserve: bool,
}

impl CoordinatorConfig {
    /// Defaults: scan interval by target, three tolerated failures, 30 s timeout.
    pub fn new(credentials: Credentials, target: ApiTarget) -> Self {
        let scan_interval = if target.is_local() {
            DEFAULT_LOCAL_SCAN_INTERVAL
        } else {
            DEFAULT_SCAN_INTERVAL
        };
        Self {
            credentials,
            target,
            scan_interval,
            max_failures: DEFAULT_MAX_FAILURES,
            timeout: DEFAULT_TIMEOUT,
            preserve_mode_on_reserve: false,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |message: &str| {
            Err(CoreError::Config {
                message: message.to_owned(),
            })
        };
        if self.credentials.username.trim().is_empty() {
            return invalid("username must not be empty");
        }
        if self.credentials.gateway_id.trim().is_empty() {
            return invalid("gateway id must not be empty");
        }
        if let ApiTarget::Local { host } = &self.target {
            if host.trim().is_empty() {
                return invalid("local API requires a host");
            }
        }
        if self.max_failures == 0 {
            return invalid("max_failures must be at least 1");
        }
        if self.scan_interval.is_zero() {
            return invalid("scan_interval must be greater than zero");
        }
        Ok(())
    }
}
