// ── Device domain types ──

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};

/// Value used for channel and channel width when the controller reports
/// something that is not a number.
pub const UNKNOWN_CHANNEL: i32 = -1;

/// WiFi band of a radio. The string form is the metric label value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, AsRefStr,
)]
pub enum Band {
    /// 2.4 GHz (802.11b/g/n).
    #[strum(serialize = "2.4")]
    #[serde(rename = "2.4")]
    Bgn,
    /// 5 GHz (802.11ac).
    #[strum(serialize = "5")]
    #[serde(rename = "5")]
    Ac,
    #[strum(serialize = "unknown")]
    #[serde(rename = "unknown")]
    Unknown,
}

/// Whether a device is up or down, and since when.
///
/// A device is always exactly one of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Availability {
    Up { since: DateTime<Utc> },
    Down { since: DateTime<Utc> },
}

impl Availability {
    /// Start of the current uptime, if the device is up.
    pub fn up_since(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Up { since } => Some(*since),
            Self::Down { .. } => None,
        }
    }

    /// Start of the current downtime, if the device is down.
    pub fn down_since(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Down { since } => Some(*since),
            Self::Up { .. } => None,
        }
    }
}

/// Most recent reboot of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebootEvent {
    pub at: DateTime<Utc>,
    pub reason: String,
}

/// One radio of an access point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Radio {
    pub band: Band,
    /// Channel number, or [`UNKNOWN_CHANNEL`].
    pub channel: i32,
    /// Channel width in MHz, or [`UNKNOWN_CHANNEL`].
    pub channel_width: i32,
    pub power: i64,
    /// 0..=100
    pub quality: i64,
    /// Average receive rate in bits per second.
    pub rx_bps: i64,
    /// Average transmit rate in bits per second.
    pub tx_bps: i64,
}

/// A WiFi access point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub mac: String,
    pub serial: String,
    pub model: String,
    pub site: String,
    pub hostname: String,
    pub firmware: String,
    pub availability: Availability,
    pub last_reboot: Option<RebootEvent>,
    pub radios: Vec<Radio>,
}
