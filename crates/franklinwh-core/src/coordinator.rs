// ── Coordinator ──
//
// Polls one FranklinWH gateway, tolerates short outages by serving the
// last good snapshot, and forwards user commands to the gateway. The
// client is built lazily on the first refresh.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use franklinwh_api::{Error as ApiError, Mode, ModeKind, SwitchState};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{CoordinatorConfig, Credentials};
use crate::error::CoreError;
use crate::gateway::{ClientFactory, GatewayApi, HttpClientFactory};
use crate::mode::OperationMode;
use crate::snapshot::{CoordinatorState, GatewaySnapshot};

/// Coordinator backed by the HTTP client.
pub type HttpCoordinator = Coordinator<HttpClientFactory>;

// ── Fetch failures ───────────────────────────────────────────────

/// Why a single fetch attempt failed, before the failure policy runs.
#[derive(Debug)]
enum FetchFailure {
    Api(ApiError),
    NoStats,
}

impl FetchFailure {
    fn is_auth(&self) -> bool {
        match self {
            Self::Api(e) => is_credential_error(e),
            Self::NoStats => false,
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(e) => write!(f, "{e}"),
            Self::NoStats => f.write_str("Failed to fetch stats from FranklinWH API"),
        }
    }
}

/// Typed auth errors, plus gateway messages that mention auth or tokens.
/// The gateway reports some credential problems only in text.
fn is_credential_error(e: &ApiError) -> bool {
    e.is_auth_failure() || e.server_message().is_some_and(mentions_credentials)
}

fn mentions_credentials(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("auth") || lower.contains("token")
}

// ── Coordinator ──────────────────────────────────────────────────

/// Refresh controller and command forwarder for one gateway.
///
/// Cheaply cloneable via `Arc`. Refresh cycles are serialized: a refresh
/// triggered by a command waits for a scheduled one in flight, and the
/// reverse.
pub struct Coordinator<F: ClientFactory> {
    inner: Arc<CoordinatorInner<F>>,
}

impl<F: ClientFactory> Clone for Coordinator<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<F: ClientFactory> {
    config: CoordinatorConfig,
    credentials: Mutex<Credentials>,
    factory: Arc<F>,
    /// Held across construction so at most one client is ever being built.
    client: Mutex<Option<Arc<F::Client>>>,
    refresh_gate: Mutex<()>,
    failures: AtomicU32,
    snapshot: watch::Sender<Option<Arc<GatewaySnapshot>>>,
    state: watch::Sender<CoordinatorState>,
    cancel: CancellationToken,
    /// Child of `cancel` for the running background task; replaced on
    /// shutdown so the coordinator can be started again.
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl HttpCoordinator {
    /// Coordinator talking to the target named in `config`.
    pub fn from_config(config: CoordinatorConfig) -> Self {
        let factory = HttpClientFactory::from_config(&config);
        Self::new(config, factory)
    }
}

impl<F: ClientFactory> Coordinator<F> {
    /// Create a coordinator. Does NOT contact the gateway; the client is
    /// built on the first [`refresh()`](Self::refresh).
    pub fn new(config: CoordinatorConfig, factory: F) -> Self {
        let (snapshot, _) = watch::channel(None);
        let (state, _) = watch::channel(CoordinatorState::Uninitialized);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(CoordinatorInner {
                credentials: Mutex::new(config.credentials.clone()),
                config,
                factory: Arc::new(factory),
                client: Mutex::new(None),
                refresh_gate: Mutex::new(()),
                failures: AtomicU32::new(0),
                snapshot,
                state,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Run one refresh cycle.
    ///
    /// Returns the fresh snapshot on success. On a transient failure the
    /// previous snapshot is returned until `max_failures` consecutive
    /// failures have occurred, after which [`CoreError::Communication`] is
    /// returned regardless of cached data. Authentication failures are
    /// never masked.
    pub async fn refresh(&self) -> Result<Arc<GatewaySnapshot>, CoreError> {
        let _cycle = self.inner.refresh_gate.lock().await;

        let client = self.ensure_client().await?;

        match fetch(client.as_ref()).await {
            Ok(snapshot) => Ok(self.record_success(snapshot)),
            Err(failure) if failure.is_auth() => {
                self.inner.client.lock().await.take();
                Err(self.enter_auth_failed(failure.to_string()))
            }
            Err(failure) => self.record_transient(&failure),
        }
    }

    /// Return the cached client, building one if there is none yet.
    async fn ensure_client(&self) -> Result<Arc<F::Client>, CoreError> {
        let mut slot = self.inner.client.lock().await;
        if let Some(client) = slot.as_ref() {
            return Ok(Arc::clone(client));
        }

        let credentials = self.inner.credentials.lock().await.clone();
        let factory = Arc::clone(&self.inner.factory);
        debug!(gateway = %credentials.gateway_id, "building FranklinWH client");

        let built = tokio::spawn(async move { factory.connect(credentials).await }).await;

        match built {
            Ok(Ok(client)) => {
                let client = Arc::new(client);
                *slot = Some(Arc::clone(&client));
                info!("FranklinWH client ready");
                Ok(client)
            }
            Ok(Err(e)) if is_credential_error(&e) => {
                Err(self.enter_auth_failed(format!("Failed to initialize client: {e}")))
            }
            Ok(Err(e)) => {
                warn!(error = %e, "client construction failed");
                Err(CoreError::ClientInit {
                    message: e.to_string(),
                })
            }
            Err(join) => {
                warn!(error = %join, "client construction task failed");
                Err(CoreError::ClientInit {
                    message: join.to_string(),
                })
            }
        }
    }

    fn record_success(&self, snapshot: GatewaySnapshot) -> Arc<GatewaySnapshot> {
        self.inner.failures.store(0, Ordering::SeqCst);
        let snapshot = Arc::new(snapshot);
        self.inner.snapshot.send_replace(Some(Arc::clone(&snapshot)));
        self.inner.state.send_replace(CoordinatorState::Healthy);
        snapshot
    }

    fn record_transient(&self, failure: &FetchFailure) -> Result<Arc<GatewaySnapshot>, CoreError> {
        let failures = self.inner.failures.fetch_add(1, Ordering::SeqCst) + 1;
        let max = self.inner.config.max_failures;
        warn!("API error (attempt {failures}/{max}): {failure}");

        if failures >= max {
            error!("max consecutive failures reached, marking unavailable");
            self.inner.state.send_replace(CoordinatorState::Unavailable);
            return Err(CoreError::Communication {
                message: failure.to_string(),
            });
        }

        self.inner
            .state
            .send_replace(CoordinatorState::Degraded { failures });

        match self.snapshot() {
            Some(cached) => {
                debug!("returning last known data due to temporary failure");
                Ok(cached)
            }
            None => Err(CoreError::Communication {
                message: failure.to_string(),
            }),
        }
    }

    fn enter_auth_failed(&self, message: String) -> CoreError {
        error!("authentication failed: {message}");
        self.inner.state.send_replace(CoordinatorState::AuthFailed);
        CoreError::AuthFailed { message }
    }

    /// Refresh after a command. Errors are logged, never returned.
    pub async fn request_refresh(&self) {
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "refresh after command failed");
        }
    }

    // ── Commands ─────────────────────────────────────────────────

    async fn client(&self) -> Result<Arc<F::Client>, CoreError> {
        self.inner
            .client
            .lock()
            .await
            .clone()
            .ok_or(CoreError::ClientNotReady)
    }

    /// Set all three smart switches.
    pub async fn set_switch_state(&self, state: SwitchState) -> Result<(), CoreError> {
        let client = self.client().await?;

        if let Err(e) = client.set_smart_switch_state(state).await {
            error!(error = %e, "failed to set switch state");
            return Err(CoreError::CommandFailed {
                operation: "set switch state",
                source: e,
            });
        }

        self.request_refresh().await;
        Ok(())
    }

    /// Set the operation mode from its identifier (`self_use`, `backup`,
    /// `time_of_use`, `clean_backup`). Unknown identifiers are rejected
    /// before any network call.
    pub async fn set_operation_mode(&self, mode: &str) -> Result<(), CoreError> {
        let Ok(mode) = mode.parse::<OperationMode>() else {
            error!("failed to set operation mode to {mode}: unknown mode");
            return Err(CoreError::InvalidMode {
                mode: mode.to_owned(),
            });
        };
        self.set_mode(mode).await
    }

    pub async fn set_mode(&self, mode: OperationMode) -> Result<(), CoreError> {
        let client = self.client().await?;

        if let Err(e) = client.set_mode(mode.to_mode()).await {
            error!(error = %e, "failed to set operation mode to {mode}");
            return Err(CoreError::CommandFailed {
                operation: "set operation mode",
                source: e,
            });
        }

        self.request_refresh().await;
        info!("successfully set operation mode to {mode}");
        Ok(())
    }

    /// Set the battery reserve percentage (0-100).
    ///
    /// The current mode is read first, best-effort. Unless
    /// `preserve_mode_on_reserve` is set, the new reserve is always applied
    /// through self-consumption mode, so a gateway in time-of-use or backup
    /// is switched to self-consumption as a side effect.
    pub async fn set_battery_reserve(&self, reserve: u8) -> Result<(), CoreError> {
        if reserve > 100 {
            return Err(CoreError::InvalidReserve { reserve });
        }
        let client = self.client().await?;

        let current = match client.get_mode().await {
            Ok(mode) => {
                debug!(?mode, "current mode retrieved");
                Some(mode)
            }
            Err(e) => {
                warn!(error = %e, "could not retrieve current mode, defaulting to self_consumption");
                None
            }
        };

        let mode = if self.inner.config.preserve_mode_on_reserve {
            let kind = current.map_or(ModeKind::SelfConsumption, |m| m.kind);
            Mode::new(kind, Some(reserve))
        } else {
            Mode::self_consumption(Some(reserve))
        };

        if let Err(e) = client.set_mode(mode).await {
            error!(error = %e, "failed to set battery reserve to {reserve}%");
            return Err(CoreError::CommandFailed {
                operation: "set battery reserve",
                source: e,
            });
        }

        self.request_refresh().await;
        info!("successfully set battery reserve to {reserve}%");
        Ok(())
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Run an initial refresh, then spawn the periodic refresh task.
    ///
    /// The task is spawned whatever the outcome of the initial refresh;
    /// that outcome is returned so the caller can report it.
    pub async fn start(&self) -> Result<Arc<GatewaySnapshot>, CoreError> {
        let initial = self.refresh().await;

        let cancel = self.inner.cancel_child.lock().await.clone();
        let period = self.inner.config.scan_interval;
        let coordinator = self.clone();
        self.inner
            .task_handles
            .lock()
            .await
            .push(tokio::spawn(refresh_task(coordinator, period, cancel)));
        debug!(?period, "refresh task started");

        initial
    }

    /// Stop background tasks and wait for them to finish.
    pub async fn shutdown(&self) {
        {
            let mut child = self.inner.cancel_child.lock().await;
            child.cancel();
            *child = self.inner.cancel.child_token();
        }

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("coordinator stopped");
    }

    /// Replace the credentials after an authentication failure.
    ///
    /// Drops the current client, clears the failure counter, and moves the
    /// state back to `Uninitialized` so the background task resumes.
    pub async fn reauthenticate(&self, credentials: Credentials) {
        let _cycle = self.inner.refresh_gate.lock().await;
        *self.inner.credentials.lock().await = credentials;
        self.inner.client.lock().await.take();
        self.inner.failures.store(0, Ordering::SeqCst);
        self.inner
            .state
            .send_replace(CoordinatorState::Uninitialized);
        info!("credentials replaced");
    }

    // ── Observers ────────────────────────────────────────────────

    /// The last good snapshot, if any.
    pub fn snapshot(&self) -> Option<Arc<GatewaySnapshot>> {
        self.inner.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<GatewaySnapshot>>> {
        self.inner.snapshot.subscribe()
    }

    /// Stream of snapshots, starting with the current one.
    pub fn snapshot_stream(&self) -> WatchStream<Option<Arc<GatewaySnapshot>>> {
        WatchStream::new(self.subscribe())
    }

    pub fn state(&self) -> watch::Receiver<CoordinatorState> {
        self.inner.state.subscribe()
    }

    pub fn current_state(&self) -> CoordinatorState {
        *self.inner.state.borrow()
    }

    /// Whether consumers should treat the data as available: a snapshot
    /// exists and the failure threshold has not been reached.
    pub fn is_available(&self) -> bool {
        matches!(
            self.current_state(),
            CoordinatorState::Healthy | CoordinatorState::Degraded { .. }
        ) && self.inner.snapshot.borrow().is_some()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.failures.load(Ordering::SeqCst)
    }
}

// ── Fetch ────────────────────────────────────────────────────────

async fn fetch<C: GatewayApi>(client: &C) -> Result<GatewaySnapshot, FetchFailure> {
    let stats = client
        .get_stats()
        .await
        .map_err(FetchFailure::Api)?
        .ok_or(FetchFailure::NoStats)?;

    debug!(
        soc = stats.current.battery_soc,
        solar = stats.current.solar_production,
        grid = stats.current.grid_use,
        "stats fetched"
    );

    let switch_state = match client.get_smart_switch_state().await {
        Ok(state) => state,
        Err(e) => {
            debug!(error = %e, "failed to fetch switch state");
            SwitchState::default()
        }
    };

    Ok(GatewaySnapshot::new(stats, switch_state))
}

// ── Background task ──────────────────────────────────────────────

async fn refresh_task<F: ClientFactory>(
    coordinator: Coordinator<F>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if coordinator.current_state() == CoordinatorState::AuthFailed {
                    debug!("authentication failed, skipping refresh until credentials are replaced");
                } else if let Err(e) = coordinator.refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}
