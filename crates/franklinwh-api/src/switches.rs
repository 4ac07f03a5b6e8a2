// Smart switch endpoints
//
// The aGate exposes three smart circuits. Their on/off state travels as
// `proLoad`, an array of three integers where `1` means on.

use serde_json::json;
use tracing::debug;

use crate::client::Client;
use crate::error::Error;
use crate::models::{SwitchState, SwitchStateResult};

const GET_SWITCH_PATH: &str = "hes-gateway/terminal/getSmartSwitchState";
const SET_SWITCH_PATH: &str = "hes-gateway/terminal/setSmartSwitchState";

impl Client {
    /// Read the current smart switch state.
    ///
    /// `GET .../getSmartSwitchState?gatewayId=..`
    pub async fn get_smart_switch_state(&self) -> Result<SwitchState, Error> {
        debug!(gateway = %self.gateway_id(), "fetching smart switch state");
        let result: Option<SwitchStateResult> = self
            .get(GET_SWITCH_PATH, &[("gatewayId", self.gateway_id().to_owned())])
            .await?;
        let result = result.ok_or(Error::MissingData("smart switch state"))?;
        Ok(SwitchState::from_pro_load(&result.pro_load))
    }

    /// Set all three smart switches at once.
    ///
    /// `POST .../setSmartSwitchState` with `{"gatewayId": "..", "proLoad": [1, 0, 0]}`
    pub async fn set_smart_switch_state(&self, state: SwitchState) -> Result<(), Error> {
        debug!(gateway = %self.gateway_id(), ?state, "setting smart switch state");
        let _: Option<serde_json::Value> = self
            .post(
                SET_SWITCH_PATH,
                &json!({
                    "gatewayId": self.gateway_id(),
                    "proLoad": state.to_pro_load(),
                }),
            )
            .await?;
        Ok(())
    }
}
