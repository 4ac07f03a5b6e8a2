// FranklinWH API response types
//
// Every endpoint wraps its payload in `Envelope<T>`. Raw payload structs use
// `#[serde(default)]` liberally because the gateway omits fields depending on
// firmware and installed accessories (generator, V2L, smart circuits).

use serde::{Deserialize, Serialize};

// ── Response Envelope ────────────────────────────────────────────────

/// Standard FranklinWH response envelope.
///
/// ```json
/// { "code": 200, "message": "Query success!", "success": true, "result": {...} }
/// ```
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    pub result: Option<T>,
}

/// `result` of the login endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginResult {
    pub token: String,
}

// ── Statistics ───────────────────────────────────────────────────────

/// `result` of `getDeviceCompositeInfo`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CompositeInfo {
    #[serde(default)]
    pub runtime_data: Option<RuntimeData>,
}

/// Raw runtime telemetry. Power values are kW, energy values are kWh.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RuntimeData {
    #[serde(default)]
    pub soc: f64,
    #[serde(default)]
    pub p_sun: f64,
    #[serde(default)]
    pub p_gen: f64,
    #[serde(default)]
    pub p_fhp: f64,
    #[serde(default)]
    pub p_uti: f64,
    #[serde(default)]
    pub p_load: f64,
    /// Smart circuit loads: switch 1, switch 2, V2L.
    #[serde(default)]
    pub pro_load: Vec<f64>,
    #[serde(default)]
    pub kwh_fhp_chg: f64,
    #[serde(default)]
    pub kwh_fhp_di: f64,
    #[serde(default)]
    pub kwh_uti_in: f64,
    #[serde(default)]
    pub kwh_uti_out: f64,
    #[serde(default)]
    pub kwh_sun: f64,
    #[serde(default)]
    pub kwh_gen: f64,
    #[serde(default)]
    pub kwh_load: f64,
    /// Smart circuit energy: switch 1, switch 2.
    #[serde(default)]
    pub kwh_pro_load: Vec<f64>,
}

/// Instantaneous power flows (kW) and battery state of charge (%).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Current {
    pub solar_production: f64,
    pub generator_production: f64,
    /// Positive when the battery discharges, negative when it charges.
    pub battery_use: f64,
    /// Positive when importing from the grid, negative when exporting.
    pub grid_use: f64,
    pub home_load: f64,
    pub battery_soc: f64,
    pub switch_1_load: f64,
    pub switch_2_load: f64,
    pub v2l_use: f64,
}

/// Energy totals for the current day (kWh).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub battery_charge: f64,
    pub battery_discharge: f64,
    pub grid_import: f64,
    pub grid_export: f64,
    pub solar: f64,
    pub generator: f64,
    pub home_use: f64,
    pub switch_1_use: f64,
    pub switch_2_use: f64,
}

/// Gateway statistics as returned by [`Client::get_stats`](crate::Client::get_stats).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub current: Current,
    pub totals: Totals,
}

fn slot(values: &[f64], idx: usize) -> f64 {
    values.get(idx).copied().unwrap_or_default()
}

impl From<RuntimeData> for Stats {
    fn from(raw: RuntimeData) -> Self {
        Self {
            current: Current {
                solar_production: raw.p_sun,
                generator_production: raw.p_gen,
                battery_use: raw.p_fhp,
                grid_use: raw.p_uti,
                home_load: raw.p_load,
                battery_soc: raw.soc,
                switch_1_load: slot(&raw.pro_load, 0),
                switch_2_load: slot(&raw.pro_load, 1),
                v2l_use: slot(&raw.pro_load, 2),
            },
            totals: Totals {
                battery_charge: raw.kwh_fhp_chg,
                battery_discharge: raw.kwh_fhp_di,
                grid_import: raw.kwh_uti_in,
                grid_export: raw.kwh_uti_out,
                solar: raw.kwh_sun,
                generator: raw.kwh_gen,
                home_use: raw.kwh_load,
                switch_1_use: slot(&raw.kwh_pro_load, 0),
                switch_2_use: slot(&raw.kwh_pro_load, 1),
            },
        }
    }
}

// ── Smart switches ───────────────────────────────────────────────────

/// On/off state of the three smart-circuit switches.
///
/// Defaults to all-off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SwitchState(pub [bool; 3]);

impl SwitchState {
    pub fn new(switch_1: bool, switch_2: bool, switch_3: bool) -> Self {
        Self([switch_1, switch_2, switch_3])
    }

    pub fn as_tuple(self) -> (bool, bool, bool) {
        let [a, b, c] = self.0;
        (a, b, c)
    }

    /// Wire encoding: `1` for on, `0` for off.
    pub(crate) fn to_pro_load(self) -> [u8; 3] {
        self.0.map(u8::from)
    }

    /// Missing slots read as off.
    pub(crate) fn from_pro_load(values: &[i64]) -> Self {
        let on = |idx: usize| values.get(idx).is_some_and(|v| *v == 1);
        Self([on(0), on(1), on(2)])
    }
}

/// `result` of `getSmartSwitchState`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SwitchStateResult {
    #[serde(default)]
    pub pro_load: Vec<i64>,
}

// ── Operation mode ───────────────────────────────────────────────────

/// `result` of `getGatewayTouListV2`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TouList {
    /// Id of the active entry in `list`. The API spells it `currendId`.
    pub currend_id: i64,
    #[serde(default)]
    pub list: Vec<TouEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TouEntry {
    pub id: i64,
    pub work_mode: u8,
    #[serde(default)]
    pub soc: Option<f64>,
}
