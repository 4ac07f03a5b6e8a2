// ── Gateway abstraction ──
//
// The coordinator talks to the gateway through `GatewayApi` and builds
// clients through `ClientFactory`. The HTTP implementations live here;
// tests substitute scripted ones.

use std::future::Future;

use franklinwh_api::{ApiTarget, Client, Error as ApiError, Mode, Stats, SwitchState, TransportConfig};

use crate::config::{CoordinatorConfig, Credentials};

/// Operations the coordinator needs from a gateway client.
pub trait GatewayApi: Send + Sync + 'static {
    /// `Ok(None)` means the gateway answered without any statistics.
    fn get_stats(&self) -> impl Future<Output = Result<Option<Stats>, ApiError>> + Send;

    fn get_smart_switch_state(&self) -> impl Future<Output = Result<SwitchState, ApiError>> + Send;

    fn set_smart_switch_state(&self, state: SwitchState) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn get_mode(&self) -> impl Future<Output = Result<Mode, ApiError>> + Send;

    fn set_mode(&self, mode: Mode) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Builds an authenticated [`GatewayApi`] from credentials.
///
/// Construction performs network I/O (login), so the coordinator runs it on
/// a spawned task.
pub trait ClientFactory: Send + Sync + 'static {
    type Client: GatewayApi;

    fn connect(&self, credentials: Credentials) -> impl Future<Output = Result<Self::Client, ApiError>> + Send;
}

impl GatewayApi for Client {
    fn get_stats(&self) -> impl Future<Output = Result<Option<Stats>, ApiError>> + Send {
        Client::get_stats(self)
    }

    fn get_smart_switch_state(&self) -> impl Future<Output = Result<SwitchState, ApiError>> + Send {
        Client::get_smart_switch_state(self)
    }

    fn set_smart_switch_state(&self, state: SwitchState) -> impl Future<Output = Result<(), ApiError>> + Send {
        Client::set_smart_switch_state(self, state)
    }

    fn get_mode(&self) -> impl Future<Output = Result<Mode, ApiError>> + Send {
        Client::get_mode(self)
    }

    fn set_mode(&self, mode: Mode) -> impl Future<Output = Result<(), ApiError>> + Send {
        async move { Client::set_mode(self, &mode).await }
    }
}

/// Builds [`franklinwh_api::Client`]s for the cloud or a local aGate.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    target: ApiTarget,
    transport: TransportConfig,
}

impl HttpClientFactory {
    pub fn new(target: ApiTarget, transport: TransportConfig) -> Self {
        Self { target, transport }
    }

    pub fn from_config(config: &CoordinatorConfig) -> Self {
        Self::new(
            config.target.clone(),
            TransportConfig {
                timeout: config.timeout,
                ..TransportConfig::default()
            },
        )
    }
}

impl ClientFactory for HttpClientFactory {
    type Client = Client;

    fn connect(&self, credentials: Credentials) -> impl Future<Output = Result<Client, ApiError>> + Send {
        async move {
            Client::connect(
                &self.target,
                &credentials.username,
                credentials.password,
                &credentials.gateway_id,
                &self.transport,
            )
            .await
        }
    }
}
