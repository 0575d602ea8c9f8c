use serde::Serialize;

use super::device::Device;

/// Summary counters of one AP group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApGroupSummary {
    pub name: String,
    pub device_count: i64,
    pub offline_count: i64,
    pub out_of_sync_count: i64,
    /// Currently connected clients.
    pub client_count: i64,
    /// Clients seen in the past 24 hours.
    pub client_count_24h: i64,
}

/// Everything fetched for one AP group during a scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FleetSnapshot {
    #[serde(rename = "apgroup")]
    pub summary: ApGroupSummary,
    pub devices: Vec<Device>,
}
