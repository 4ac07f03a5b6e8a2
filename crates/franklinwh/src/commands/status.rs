//! Status command: one refresh, rendered in the selected format.

use serde::Serialize;
use tabled::Tabled;

use franklinwh_core::{CoordinatorState, GatewaySnapshot, HttpCoordinator};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

// ── View ────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub(crate) struct StatusView<'a> {
    #[serde(flatten)]
    pub state: CoordinatorState,
    pub snapshot: &'a GatewaySnapshot,
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

fn row(metric: &'static str, value: String) -> MetricRow {
    MetricRow { metric, value }
}

fn kw(value: f64) -> String {
    format!("{value:.2} kW")
}

fn kwh(value: f64) -> String {
    format!("{value:.2} kWh")
}

fn detail(view: &StatusView<'_>, color: bool) -> String {
    let current = &view.snapshot.stats.current;
    let totals = &view.snapshot.stats.totals;
    let rows = vec![
        row("State", output::state_label(view.state, color)),
        row("Battery SOC", format!("{:.1} %", current.battery_soc)),
        row("Solar", kw(current.solar_production)),
        row("Generator", kw(current.generator_production)),
        row("Battery", kw(current.battery_use)),
        row("Grid", kw(current.grid_use)),
        row("Home load", kw(current.home_load)),
        row("Switch 1 load", kw(current.switch_1_load)),
        row("Switch 2 load", kw(current.switch_2_load)),
        row("V2L", kw(current.v2l_use)),
        row("Switches", util::switch_summary(view.snapshot.switch_state)),
        row("Solar today", kwh(totals.solar)),
        row("Grid import today", kwh(totals.grid_import)),
        row("Grid export today", kwh(totals.grid_export)),
        row("Battery charge today", kwh(totals.battery_charge)),
        row("Battery discharge today", kwh(totals.battery_discharge)),
        row("Home use today", kwh(totals.home_use)),
        row(
            "Fetched at",
            view.snapshot
                .fetched_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        ),
    ];
    output::render_table(&rows)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(coordinator: &HttpCoordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = coordinator.refresh().await?;
    let view = StatusView {
        state: coordinator.current_state(),
        snapshot: &snapshot,
    };
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &view,
        |v| detail(v, color),
        |v| format!("{:.1}", v.snapshot.stats.current.battery_soc),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
