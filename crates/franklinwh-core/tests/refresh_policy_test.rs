#![allow(clippy::unwrap_used, clippy::float_cmp)]
// Refresh policy and command forwarding tests against a scripted gateway.

use std::collections::VecDeque;
use std::future::{Future, ready};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;

use franklinwh_api::Error as ApiError;
use franklinwh_core::{
    ApiTarget, ClientFactory, Coordinator, CoordinatorConfig, CoordinatorState, CoreError, Credentials, Current,
    GatewayApi, Mode, OperationMode, Stats, SwitchState,
};

// ── Scripted gateway ────────────────────────────────────────────────

/// Queued responses. An empty queue yields a healthy default.
#[derive(Default)]
struct Script {
    connects: VecDeque<Result<(), ApiError>>,
    stats: VecDeque<Result<Option<Stats>, ApiError>>,
    switches: VecDeque<Result<SwitchState, ApiError>>,
    get_mode: VecDeque<Result<Mode, ApiError>>,
    set_mode: VecDeque<Result<(), ApiError>>,
    set_switches: VecDeque<Result<(), ApiError>>,

    connected_as: Vec<String>,
    stats_calls: u32,
    sent_modes: Vec<Mode>,
    sent_switches: Vec<SwitchState>,
}

type Shared = Arc<Mutex<Script>>;

struct MockGateway {
    script: Shared,
}

impl GatewayApi for MockGateway {
    fn get_stats(&self) -> impl Future<Output = Result<Option<Stats>, ApiError>> + Send {
        let mut script = self.script.lock().unwrap();
        script.stats_calls += 1;
        ready(script.stats.pop_front().unwrap_or_else(|| Ok(Some(stats(50.0)))))
    }

    fn get_smart_switch_state(&self) -> impl Future<Output = Result<SwitchState, ApiError>> + Send {
        let mut script = self.script.lock().unwrap();
        ready(
            script
                .switches
                .pop_front()
                .unwrap_or_else(|| Ok(SwitchState::new(true, false, true))),
        )
    }

    fn set_smart_switch_state(&self, state: SwitchState) -> impl Future<Output = Result<(), ApiError>> + Send {
        let mut script = self.script.lock().unwrap();
        script.sent_switches.push(state);
        ready(script.set_switches.pop_front().unwrap_or(Ok(())))
    }

    fn get_mode(&self) -> impl Future<Output = Result<Mode, ApiError>> + Send {
        let mut script = self.script.lock().unwrap();
        ready(
            script
                .get_mode
                .pop_front()
                .unwrap_or_else(|| Ok(Mode::time_of_use(None))),
        )
    }

    fn set_mode(&self, mode: Mode) -> impl Future<Output = Result<(), ApiError>> + Send {
        let mut script = self.script.lock().unwrap();
        script.sent_modes.push(mode);
        ready(script.set_mode.pop_front().unwrap_or(Ok(())))
    }
}

struct MockFactory {
    script: Shared,
}

impl ClientFactory for MockFactory {
    type Client = MockGateway;

    fn connect(&self, credentials: Credentials) -> impl Future<Output = Result<MockGateway, ApiError>> + Send {
        let mut script = self.script.lock().unwrap();
        script.connected_as.push(credentials.username);
        let result = script.connects.pop_front().unwrap_or(Ok(())).map(|()| MockGateway {
            script: Arc::clone(&self.script),
        });
        ready(result)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn stats(soc: f64) -> Stats {
    Stats {
        current: Current {
            battery_soc: soc,
            ..Current::default()
        },
        ..Stats::default()
    }
}

fn credentials(username: &str) -> Credentials {
    Credentials::new(username, SecretString::from("pw".to_string()), "gw-1")
}

fn config() -> CoordinatorConfig {
    CoordinatorConfig::new(credentials("owner@example.com"), ApiTarget::Cloud)
}

fn setup_with(config: CoordinatorConfig) -> (Coordinator<MockFactory>, Shared) {
    let script = Shared::default();
    let factory = MockFactory {
        script: Arc::clone(&script),
    };
    (Coordinator::new(config, factory), script)
}

fn setup() -> (Coordinator<MockFactory>, Shared) {
    setup_with(config())
}

fn offline() -> ApiError {
    ApiError::Api {
        code: 500,
        message: "gateway offline".into(),
    }
}

fn soc(snapshot: &franklinwh_core::GatewaySnapshot) -> f64 {
    snapshot.stats.current.battery_soc
}

// ── Refresh policy ──────────────────────────────────────────────────

#[tokio::test]
async fn test_cached_snapshot_served_until_failure_threshold() {
    let (coordinator, script) = setup();
    {
        let mut s = script.lock().unwrap();
        s.stats.push_back(Ok(Some(stats(50.0))));
        s.stats.push_back(Err(offline()));
        s.stats.push_back(Err(offline()));
        s.stats.push_back(Err(offline()));
        s.stats.push_back(Ok(Some(stats(55.0))));
    }

    let first = coordinator.refresh().await.unwrap();
    assert_eq!(soc(&first), 50.0);
    assert_eq!(coordinator.consecutive_failures(), 0);
    assert_eq!(coordinator.current_state(), CoordinatorState::Healthy);
    assert!(coordinator.is_available());

    let second = coordinator.refresh().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(coordinator.consecutive_failures(), 1);
    assert_eq!(coordinator.current_state(), CoordinatorState::Degraded { failures: 1 });

    let third = coordinator.refresh().await.unwrap();
    assert_eq!(soc(&third), 50.0);
    assert_eq!(coordinator.consecutive_failures(), 2);
    assert_eq!(coordinator.current_state(), CoordinatorState::Degraded { failures: 2 });
    assert!(coordinator.is_available());

    let fourth = coordinator.refresh().await;
    assert!(
        matches!(&fourth, Err(CoreError::Communication { message }) if message.contains("gateway offline")),
        "expected Communication error, got: {fourth:?}"
    );
    assert_eq!(coordinator.consecutive_failures(), 3);
    assert_eq!(coordinator.current_state(), CoordinatorState::Unavailable);
    assert!(!coordinator.is_available());

    let fifth = coordinator.refresh().await.unwrap();
    assert_eq!(soc(&fifth), 55.0);
    assert_eq!(coordinator.consecutive_failures(), 0);
    assert_eq!(coordinator.current_state(), CoordinatorState::Healthy);
    assert_eq!(coordinator.snapshot().map(|s| soc(&s)), Some(55.0));
}

#[tokio::test]
async fn test_failure_without_cache_is_communication_error() {
    let (coordinator, script) = setup();
    script.lock().unwrap().stats.push_back(Err(offline()));

    let result = coordinator.refresh().await;
    assert!(matches!(result, Err(CoreError::Communication { .. })));
    assert_eq!(coordinator.consecutive_failures(), 1);
    assert_eq!(coordinator.current_state(), CoordinatorState::Degraded { failures: 1 });
    assert!(coordinator.snapshot().is_none());
    assert!(!coordinator.is_available());
}

#[tokio::test]
async fn test_failures_past_threshold_keep_returning_communication_error() {
    let (coordinator, script) = setup();
    {
        let mut s = script.lock().unwrap();
        s.stats.push_back(Ok(Some(stats(50.0))));
        for _ in 0..4 {
            s.stats.push_back(Err(offline()));
        }
    }

    coordinator.refresh().await.unwrap();
    for _ in 0..2 {
        coordinator.refresh().await.unwrap();
    }
    for expected in [3, 4] {
        let result = coordinator.refresh().await;
        assert!(matches!(result, Err(CoreError::Communication { .. })), "got: {result:?}");
        assert_eq!(coordinator.consecutive_failures(), expected);
        assert_eq!(coordinator.current_state(), CoordinatorState::Unavailable);
    }
    assert!(!coordinator.is_available());
}

#[tokio::test]
async fn test_gateway_error_page_mentioning_token_is_transient() {
    let (coordinator, script) = setup();
    script.lock().unwrap().stats.push_back(Err(ApiError::Http {
        status: 502,
        body: r#"<html><meta name="csrf-token" content="abc">Bad Gateway</html>"#.into(),
    }));

    let result = coordinator.refresh().await;
    assert!(matches!(result, Err(CoreError::Communication { .. })), "got: {result:?}");
    assert_eq!(coordinator.current_state(), CoordinatorState::Degraded { failures: 1 });
    assert_eq!(coordinator.consecutive_failures(), 1);
}

#[tokio::test]
async fn test_missing_stats_count_as_transient_failure() {
    let (coordinator, script) = setup();
    script.lock().unwrap().stats.push_back(Ok(None));

    let result = coordinator.refresh().await;
    assert!(
        matches!(&result, Err(CoreError::Communication { message }) if message == "Failed to fetch stats from FranklinWH API"),
        "got: {result:?}"
    );
    assert_eq!(coordinator.consecutive_failures(), 1);
}

#[tokio::test]
async fn test_auth_error_is_not_masked_by_cache() {
    let (coordinator, script) = setup();
    {
        let mut s = script.lock().unwrap();
        s.stats.push_back(Ok(Some(stats(50.0))));
        s.stats.push_back(Err(ApiError::TokenExpired));
    }

    coordinator.refresh().await.unwrap();
    let result = coordinator.refresh().await;

    assert!(matches!(&result, Err(e) if e.requires_reauth()), "got: {result:?}");
    assert_eq!(coordinator.current_state(), CoordinatorState::AuthFailed);
    assert_eq!(coordinator.consecutive_failures(), 0);
    // Cached data stays published even though it is not returned.
    assert!(coordinator.snapshot().is_some());

    // The rejected client is discarded and rebuilt on the next cycle.
    coordinator.refresh().await.unwrap();
    assert_eq!(script.lock().unwrap().connected_as.len(), 2);
}

#[tokio::test]
async fn test_error_text_mentioning_token_is_auth_failure() {
    let (coordinator, script) = setup();
    script.lock().unwrap().stats.push_back(Err(ApiError::Api {
        code: 10009,
        message: "Invalid Token, please log in again".into(),
    }));

    let result = coordinator.refresh().await;
    assert!(matches!(result, Err(CoreError::AuthFailed { .. })));
    assert_eq!(coordinator.consecutive_failures(), 0);
}

#[tokio::test]
async fn test_switch_state_failure_defaults_to_all_off() {
    let (coordinator, script) = setup();
    script.lock().unwrap().switches.push_back(Err(offline()));

    let snapshot = coordinator.refresh().await.unwrap();
    assert_eq!(snapshot.switch_state, SwitchState::default());
    assert_eq!(snapshot.switch_state.as_tuple(), (false, false, false));
    assert_eq!(coordinator.current_state(), CoordinatorState::Healthy);
}

#[tokio::test]
async fn test_client_init_failure_is_retried_next_cycle() {
    let (coordinator, script) = setup();
    script.lock().unwrap().connects.push_back(Err(offline()));

    let result = coordinator.refresh().await;
    assert!(matches!(result, Err(CoreError::ClientInit { .. })), "got: {result:?}");
    assert_eq!(coordinator.consecutive_failures(), 0);
    assert_eq!(coordinator.current_state(), CoordinatorState::Uninitialized);

    coordinator.refresh().await.unwrap();
    assert_eq!(script.lock().unwrap().connected_as.len(), 2);
    assert_eq!(coordinator.current_state(), CoordinatorState::Healthy);
}

#[tokio::test]
async fn test_rejected_login_during_construction_is_auth_failure() {
    let (coordinator, script) = setup();
    script
        .lock()
        .unwrap()
        .connects
        .push_back(Err(ApiError::Authentication {
            message: "The account or password is incorrect".into(),
        }));

    let result = coordinator.refresh().await;
    assert!(matches!(result, Err(CoreError::AuthFailed { .. })));
    assert_eq!(coordinator.current_state(), CoordinatorState::AuthFailed);
}

#[tokio::test]
async fn test_client_is_built_once() {
    let (coordinator, script) = setup();
    for _ in 0..3 {
        coordinator.refresh().await.unwrap();
    }
    let s = script.lock().unwrap();
    assert_eq!(s.connected_as.len(), 1);
    assert_eq!(s.stats_calls, 3);
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_commands_before_first_refresh_are_rejected() {
    let (coordinator, script) = setup();

    let result = coordinator.set_switch_state(SwitchState::new(true, true, true)).await;
    assert!(matches!(result, Err(CoreError::ClientNotReady)));
    let result = coordinator.set_battery_reserve(40).await;
    assert!(matches!(result, Err(CoreError::ClientNotReady)));

    assert!(script.lock().unwrap().sent_switches.is_empty());
}

#[tokio::test]
async fn test_set_switch_state_forwards_and_refreshes() {
    let (coordinator, script) = setup();
    coordinator.refresh().await.unwrap();

    coordinator
        .set_switch_state(SwitchState::new(false, true, false))
        .await
        .unwrap();

    let s = script.lock().unwrap();
    assert_eq!(s.sent_switches, vec![SwitchState::new(false, true, false)]);
    assert_eq!(s.stats_calls, 2);
}

#[tokio::test]
async fn test_failed_command_is_surfaced_and_snapshot_untouched() {
    let (coordinator, script) = setup();
    let before = coordinator.refresh().await.unwrap();
    script.lock().unwrap().set_switches.push_back(Err(offline()));

    let result = coordinator.set_switch_state(SwitchState::new(true, false, false)).await;

    assert!(
        matches!(result, Err(CoreError::CommandFailed { operation: "set switch state", .. })),
        "got: {result:?}"
    );
    assert!(Arc::ptr_eq(&before, &coordinator.snapshot().unwrap()));
    assert_eq!(script.lock().unwrap().stats_calls, 1);
}

#[tokio::test]
async fn test_refresh_failure_after_command_is_not_returned() {
    let (coordinator, script) = setup();
    coordinator.refresh().await.unwrap();
    script.lock().unwrap().stats.push_back(Err(offline()));

    coordinator
        .set_switch_state(SwitchState::new(true, true, false))
        .await
        .unwrap();
    assert_eq!(coordinator.consecutive_failures(), 1);
}

#[tokio::test]
async fn test_clean_backup_sends_emergency_backup() {
    let (coordinator, script) = setup();
    coordinator.refresh().await.unwrap();

    coordinator.set_operation_mode("clean_backup").await.unwrap();
    coordinator.set_mode(OperationMode::Backup).await.unwrap();

    let s = script.lock().unwrap();
    assert_eq!(s.sent_modes, vec![Mode::emergency_backup(None), Mode::emergency_backup(None)]);
    assert_eq!(s.sent_modes[0].reserve, 100);
}

#[tokio::test]
async fn test_each_mode_identifier_maps_to_gateway_mode() {
    let (coordinator, script) = setup();
    coordinator.refresh().await.unwrap();

    coordinator.set_operation_mode("self_use").await.unwrap();
    coordinator.set_operation_mode("time_of_use").await.unwrap();

    let s = script.lock().unwrap();
    assert_eq!(s.sent_modes, vec![Mode::self_consumption(None), Mode::time_of_use(None)]);
}

#[tokio::test]
async fn test_unknown_mode_rejected_without_network_call() {
    let (coordinator, script) = setup();
    coordinator.refresh().await.unwrap();
    let calls_before = script.lock().unwrap().stats_calls;

    let result = coordinator.set_operation_mode("turbo").await;

    assert!(matches!(&result, Err(CoreError::InvalidMode { mode }) if mode == "turbo"));
    let s = script.lock().unwrap();
    assert!(s.sent_modes.is_empty());
    assert_eq!(s.stats_calls, calls_before);
}

#[tokio::test]
async fn test_battery_reserve_always_uses_self_consumption() {
    let (coordinator, script) = setup();
    coordinator.refresh().await.unwrap();
    {
        let mut s = script.lock().unwrap();
        s.get_mode.push_back(Err(offline()));
        s.get_mode.push_back(Ok(Mode::time_of_use(Some(20))));
    }

    coordinator.set_battery_reserve(30).await.unwrap();
    coordinator.set_battery_reserve(45).await.unwrap();

    let s = script.lock().unwrap();
    assert_eq!(
        s.sent_modes,
        vec![Mode::self_consumption(Some(30)), Mode::self_consumption(Some(45))]
    );
}

#[tokio::test]
async fn test_battery_reserve_can_preserve_current_mode() {
    let mut config = config();
    config.preserve_mode_on_reserve = true;
    let (coordinator, script) = setup_with(config);
    coordinator.refresh().await.unwrap();
    {
        let mut s = script.lock().unwrap();
        s.get_mode.push_back(Ok(Mode::time_of_use(Some(20))));
        s.get_mode.push_back(Err(offline()));
    }

    coordinator.set_battery_reserve(30).await.unwrap();
    coordinator.set_battery_reserve(35).await.unwrap();

    let s = script.lock().unwrap();
    assert_eq!(
        s.sent_modes,
        vec![Mode::time_of_use(Some(30)), Mode::self_consumption(Some(35))]
    );
}

#[tokio::test]
async fn test_failed_mode_change_is_surfaced() {
    let (coordinator, script) = setup();
    let before = coordinator.refresh().await.unwrap();
    script.lock().unwrap().set_mode.push_back(Err(offline()));

    let result = coordinator.set_operation_mode("backup").await;

    assert!(
        matches!(result, Err(CoreError::CommandFailed { operation: "set operation mode", .. })),
        "got: {result:?}"
    );
    assert!(Arc::ptr_eq(&before, &coordinator.snapshot().unwrap()));
    assert_eq!(script.lock().unwrap().stats_calls, 1);
}

#[tokio::test]
async fn test_failed_reserve_change_is_surfaced() {
    let (coordinator, script) = setup();
    let before = coordinator.refresh().await.unwrap();
    script.lock().unwrap().set_mode.push_back(Err(offline()));

    let result = coordinator.set_battery_reserve(30).await;

    assert!(
        matches!(result, Err(CoreError::CommandFailed { operation: "set battery reserve", .. })),
        "got: {result:?}"
    );
    let s = script.lock().unwrap();
    assert_eq!(s.sent_modes, vec![Mode::self_consumption(Some(30))]);
    assert_eq!(s.stats_calls, 1);
    drop(s);
    assert!(Arc::ptr_eq(&before, &coordinator.snapshot().unwrap()));
}

#[tokio::test]
async fn test_battery_reserve_out_of_range_is_rejected() {
    let (coordinator, script) = setup();
    coordinator.refresh().await.unwrap();

    let result = coordinator.set_battery_reserve(101).await;
    assert!(matches!(result, Err(CoreError::InvalidReserve { reserve: 101 })));
    assert!(script.lock().unwrap().sent_modes.is_empty());
}

// ── Background task ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_background_task_polls_and_pauses_on_auth_failure() {
    let (coordinator, script) = setup();
    let stats_calls = || script.lock().unwrap().stats_calls;

    coordinator.start().await.unwrap();
    assert_eq!(stats_calls(), 1);

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(stats_calls(), 2);

    script.lock().unwrap().stats.push_back(Err(ApiError::TokenExpired));
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(stats_calls(), 3);
    assert_eq!(coordinator.current_state(), CoordinatorState::AuthFailed);

    // Ticks are skipped while credentials are rejected.
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(stats_calls(), 3);

    coordinator.reauthenticate(credentials("new@example.com")).await;
    assert_eq!(coordinator.current_state(), CoordinatorState::Uninitialized);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(stats_calls(), 4);
    assert_eq!(coordinator.current_state(), CoordinatorState::Healthy);
    assert_eq!(
        script.lock().unwrap().connected_as.last().map(String::as_str),
        Some("new@example.com")
    );

    coordinator.shutdown().await;
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(stats_calls(), 4);
}

#[tokio::test]
async fn test_subscribers_see_new_snapshots() {
    let (coordinator, _script) = setup();
    let mut rx = coordinator.subscribe();
    let mut state = coordinator.state();
    assert!(rx.borrow().is_none());

    coordinator.refresh().await.unwrap();

    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().as_ref().map(|s| soc(s)), Some(50.0));
    assert!(state.has_changed().unwrap());
    assert_eq!(*state.borrow_and_update(), CoordinatorState::Healthy);
}
