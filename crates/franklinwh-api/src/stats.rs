// Gateway statistics endpoint
//
// `getDeviceCompositeInfo` returns far more than telemetry; only the
// `runtimeData` block is decoded.

use tracing::debug;

use crate::client::Client;
use crate::error::Error;
use crate::models::{CompositeInfo, Stats};

const COMPOSITE_INFO_PATH: &str = "hes-gateway/terminal/getDeviceCompositeInfo";

impl Client {
    /// Fetch current power flows and daily energy totals.
    ///
    /// `GET hes-gateway/terminal/getDeviceCompositeInfo?gatewayId=..&refreshFlag=1`
    ///
    /// Returns `Ok(None)` when the gateway answered but had no runtime data
    /// to report (offline aGate, empty `result`).
    pub async fn get_stats(&self) -> Result<Option<Stats>, Error> {
        debug!(gateway = %self.gateway_id(), "fetching stats");
        let info: Option<CompositeInfo> = self
            .get(
                COMPOSITE_INFO_PATH,
                &[
                    ("gatewayId", self.gateway_id().to_owned()),
                    ("refreshFlag", "1".to_owned()),
                ],
            )
            .await?;

        Ok(info.and_then(|i| i.runtime_data).map(Stats::from))
    }
}
