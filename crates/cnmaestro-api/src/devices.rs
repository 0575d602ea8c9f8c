// Device statistics endpoint
//
// One request returns every AP of a group together with its radios.

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{DeviceListData, DeviceResponse};

/// Inventory and radio columns requested per device. `{group}` is
/// replaced with the AP group name.
const DEVICE_FIELDS: &[&str] = &[
    "$inventory",
    "model",
    "mac",
    "tid",
    "sn",
    "sys.online",
    "sys.upTime",
    "sys.dnTime",
    "sys.lastRbt.uTs",
    "sys.lastRbt.code",
    "mgmt.actSw",
    "cfg.name",
    "lstUpd",
    "radio.mac",
    "radio.MIRTName",
    "config.profile:{group}",
    "$radios",
    "id",
    "rxAvg",
    "txAvg",
    "band",
    "radios.mac",
    "channel",
    "chWidth",
    "rfqlt",
    "pow",
];

impl ApiClient {
    /// List all devices of an AP group, with radio statistics.
    ///
    /// `GET /stats/profiles/{group}/devices?all=true&fields=...&limit=0&offset=0&sortedBy=cfg.name`
    pub async fn list_devices(&self, group: &str) -> Result<Vec<DeviceResponse>, Error> {
        debug!(group, "listing devices");
        let path = format!("/stats/profiles/{group}/devices");
        let data: DeviceListData = self
            .get(
                &path,
                &[
                    ("all", "true".into()),
                    ("fields", device_fields(group)),
                    ("limit", "0".into()),
                    ("offset", "0".into()),
                    ("sortedBy", "cfg.name".into()),
                ],
            )
            .await?;
        Ok(data.profiles.devices)
    }
}

fn device_fields(group: &str) -> String {
    DEVICE_FIELDS.join(",").replace("{group}", group)
}
