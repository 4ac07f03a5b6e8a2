//! Watch command: run the background refresh loop and print each snapshot
//! until interrupted.

use tokio_stream::StreamExt;
use tracing::warn;

use franklinwh_core::{CoordinatorState, GatewaySnapshot, HttpCoordinator};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::status::StatusView;
use super::util;

fn line(snapshot: &GatewaySnapshot, state: CoordinatorState, color: bool) -> String {
    let current = &snapshot.stats.current;
    format!(
        "{}  SOC {:>5.1}%  solar {:>6.2} kW  grid {:>6.2} kW  battery {:>6.2} kW  load {:>6.2} kW  switches {}  [{}]",
        snapshot.fetched_at.with_timezone(&chrono::Local).format("%H:%M:%S"),
        current.battery_soc,
        current.solar_production,
        current.grid_use,
        current.battery_use,
        current.home_load,
        util::switch_summary(snapshot.switch_state),
        output::state_label(state, color),
    )
}

fn render(
    snapshot: &GatewaySnapshot,
    state: CoordinatorState,
    global: &GlobalOpts,
    color: bool,
) -> Result<String, CliError> {
    match global.output {
        OutputFormat::Table | OutputFormat::Plain => Ok(line(snapshot, state, color)),
        // One JSON document per line so the stream stays parseable.
        _ => output::render_single(
            &OutputFormat::JsonCompact,
            &StatusView { state, snapshot },
            |_| String::new(),
            |_| String::new(),
        ),
    }
}

pub async fn handle(coordinator: &HttpCoordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    if let Err(e) = coordinator.start().await {
        if e.requires_reauth() {
            coordinator.shutdown().await;
            return Err(e.into());
        }
        warn!(error = %e, "initial refresh failed, will keep polling");
    }

    let mut snapshots = coordinator.snapshot_stream();
    let mut states = coordinator.state();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            _ = &mut ctrl_c => break Ok(()),
            Some(Some(snapshot)) = snapshots.next() => {
                match render(&snapshot, coordinator.current_state(), global, color) {
                    Ok(out) => output::print_output(&out, global.quiet),
                    Err(e) => break Err(e),
                }
            }
            Ok(()) = states.changed() => {
                let state = *states.borrow_and_update();
                if !global.quiet {
                    eprintln!("state: {}", output::state_label(state, color));
                }
                if state == CoordinatorState::AuthFailed {
                    break Err(CliError::AuthFailed {
                        profile: "default".into(),
                        message: "credentials rejected while polling".into(),
                    });
                }
            }
        }
    };

    coordinator.shutdown().await;
    result
}
