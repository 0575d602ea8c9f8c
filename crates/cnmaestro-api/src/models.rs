// cnMaestro API response types
//
// Every endpoint wraps its payload in `{ "data": ... }`. The inner shapes
// differ per endpoint, so each gets its own named schema. Fields use
// `#[serde(default)]` where the controller omits them for some devices
// (offline APs, unprovisioned radios, etc.).

use serde::{Deserialize, Deserializer, Serialize};

// ── Response Envelope ────────────────────────────────────────────────

/// Standard `{ "data": T }` envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

// ── AP groups ────────────────────────────────────────────────────────

/// `data` of `GET /config/profiles`.
#[derive(Debug, Deserialize)]
pub struct ProfileList<T> {
    #[serde(default = "Vec::new")]
    pub profiles: Vec<T>,
}

/// Minimal AP group entry (listing).
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileName {
    pub name: String,
}

/// AP group entry with the summary counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApGroupResponse {
    pub name: String,
    #[serde(default)]
    pub device_count: i64,
    #[serde(default)]
    pub offline_count: i64,
    #[serde(default)]
    pub out_of_sync_count: i64,
    #[serde(default)]
    pub client_count: i64,
    #[serde(default, rename = "clientCount24h")]
    pub client_count_24h: i64,
}

// ── Devices ──────────────────────────────────────────────────────────

/// `data` of `GET /stats/profiles/{group}/devices`.
#[derive(Debug, Deserialize)]
pub struct DeviceListData {
    pub profiles: DeviceListProfiles,
}

#[derive(Debug, Deserialize)]
pub struct DeviceListProfiles {
    #[serde(default)]
    pub devices: Vec<DeviceResponse>,
}

/// One access point as reported by the device statistics endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default, rename = "sn")]
    pub serial: String,
    /// Site (tenant) name.
    #[serde(default, rename = "tid")]
    pub site: String,
    #[serde(default, rename = "cfg")]
    pub config: DeviceConfig,
    #[serde(default, rename = "sys")]
    pub system: DeviceSystem,
    #[serde(default, rename = "mgmt")]
    pub management: DeviceManagement,
    #[serde(default)]
    pub radios: Vec<RadioResponse>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Hostname.
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceSystem {
    #[serde(default)]
    pub online: bool,
    /// Epoch milliseconds the device came online.
    #[serde(default, rename = "upTime")]
    pub up_time: i64,
    /// Epoch milliseconds the device went offline.
    #[serde(default, rename = "dnTime")]
    pub down_time: i64,
    #[serde(default, rename = "lastRbt")]
    pub reboots: Vec<RebootResponse>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RebootResponse {
    /// Epoch seconds.
    #[serde(default, rename = "uTs")]
    pub timestamp: i64,
    #[serde(default, rename = "code")]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceManagement {
    #[serde(default, rename = "actSw")]
    pub firmware_version: String,
}

/// One radio of an access point.
///
/// `channel` and `chWidth` arrive as strings on most firmware, as numbers
/// on some; both are kept as raw text and parsed during normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RadioResponse {
    #[serde(default)]
    pub id: i64,
    /// `"2.4GHz"` or `"5GHz"`.
    #[serde(default)]
    pub band: String,
    #[serde(default, rename = "chWidth", deserialize_with = "string_or_number")]
    pub channel_width: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub channel: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default, rename = "pow")]
    pub power: i64,
    /// Percentage points.
    #[serde(default, rename = "rfqlt")]
    pub quality: i64,
    /// kbit/s
    #[serde(default, rename = "rxAvg")]
    pub rx_avg: i64,
    /// kbit/s
    #[serde(default, rename = "txAvg")]
    pub tx_avg: i64,
}

// ── Guest portals ────────────────────────────────────────────────────

/// `data` of `GET /services/guest/portal`.
#[derive(Debug, Deserialize)]
pub struct PortalListData {
    #[serde(default, rename = "result")]
    pub portals: Vec<PortalResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortalResponse {
    pub name: String,
}

/// `data` of `GET /services/guest/session/{portal}`.
#[derive(Debug, Deserialize)]
pub struct SessionPageData {
    #[serde(default)]
    pub sessions: Vec<GuestSessionResponse>,
    pub meta: SessionPageMeta,
}

#[derive(Debug, Deserialize)]
pub struct SessionPageMeta {
    /// Total number of sessions across all pages.
    pub total: u64,
}

/// One active guest session. Only the serving AP matters here.
#[derive(Debug, Clone, Deserialize)]
pub struct GuestSessionResponse {
    #[serde(default, rename = "apMac", alias = "ap_mac")]
    pub device_mac: String,
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Accept a JSON string, number, or null and keep its textual form.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}
