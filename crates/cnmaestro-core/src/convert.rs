// ── API-to-domain type conversions ──
//
// Bridges raw `cnmaestro_api` response types into the canonical
// `cnmaestro_core::model` types. Conversions never fail: unparsable
// fields become sentinels and missing timestamps fall back to the epoch.

use chrono::{DateTime, Utc};

use cnmaestro_api::guest::PortalSessionCounts;
use cnmaestro_api::models::{ApGroupResponse, DeviceResponse, RadioResponse, RebootResponse};

use crate::model::device::UNKNOWN_CHANNEL;
use crate::model::{
    ApGroupSummary, Availability, Band, Device, PortalSessionAggregate, Radio, RebootEvent,
};

// ── Helpers ────────────────────────────────────────────────────────

/// Epoch milliseconds to an instant.
fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Epoch seconds to an instant.
fn from_secs(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn parse_channel(raw: &str) -> i32 {
    raw.parse().unwrap_or(UNKNOWN_CHANNEL)
}

fn map_band(raw: &str) -> Band {
    match raw {
        "2.4GHz" => Band::Bgn,
        "5GHz" => Band::Ac,
        _ => Band::Unknown,
    }
}

/// The reboot with the highest timestamp; the first one wins on ties.
fn latest_reboot(reboots: &[RebootResponse]) -> Option<RebootEvent> {
    reboots
        .iter()
        .reduce(|latest, r| if r.timestamp > latest.timestamp { r } else { latest })
        .map(|r| RebootEvent {
            at: from_secs(r.timestamp),
            reason: r.reason.clone(),
        })
}

// ── AP group ───────────────────────────────────────────────────────

impl From<ApGroupResponse> for ApGroupSummary {
    fn from(g: ApGroupResponse) -> Self {
        Self {
            name: g.name,
            device_count: g.device_count,
            offline_count: g.offline_count,
            out_of_sync_count: g.out_of_sync_count,
            client_count: g.client_count,
            client_count_24h: g.client_count_24h,
        }
    }
}

// ── Device ─────────────────────────────────────────────────────────

impl From<RadioResponse> for Radio {
    fn from(r: RadioResponse) -> Self {
        Self {
            band: map_band(&r.band),
            channel: parse_channel(&r.channel),
            channel_width: parse_channel(&r.channel_width),
            power: r.power,
            quality: r.quality,
            // kbit/s on the wire
            rx_bps: r.rx_avg.saturating_mul(1000),
            tx_bps: r.tx_avg.saturating_mul(1000),
        }
    }
}

impl From<DeviceResponse> for Device {
    fn from(d: DeviceResponse) -> Self {
        let availability = if d.system.online {
            Availability::Up {
                since: from_millis(d.system.up_time),
            }
        } else {
            Availability::Down {
                since: from_millis(d.system.down_time),
            }
        };

        Self {
            last_reboot: latest_reboot(&d.system.reboots),
            mac: d.mac,
            serial: d.serial,
            model: d.model,
            site: d.site,
            hostname: d.config.name,
            firmware: d.management.firmware_version,
            availability,
            radios: d.radios.into_iter().map(Radio::from).collect(),
        }
    }
}

// ── Guest portal ───────────────────────────────────────────────────

/// Attach the portal name to the per-AP session counts.
pub fn portal_aggregate(portal: &str, counts: PortalSessionCounts) -> PortalSessionAggregate {
    PortalSessionAggregate {
        portal: portal.to_owned(),
        per_device: counts.per_device,
        total: counts.total,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cnmaestro_api::models::{DeviceConfig, DeviceManagement, DeviceSystem};
    use pretty_assertions::assert_eq;

    use super::*;

    fn radio(band: &str, channel: &str, width: &str) -> RadioResponse {
        RadioResponse {
            band: band.into(),
            channel: channel.into(),
            channel_width: width.into(),
            ..RadioResponse::default()
        }
    }

    fn device(online: bool) -> DeviceResponse {
        DeviceResponse {
            model: "XV3-8".into(),
            mac: "aa:bb".into(),
            serial: "SN1".into(),
            site: "HQ".into(),
            config: DeviceConfig {
                name: "ap-lobby".into(),
            },
            system: DeviceSystem {
                online,
                up_time: 60_000,
                down_time: 120_000,
                reboots: Vec::new(),
            },
            management: DeviceManagement {
                firmware_version: "6.5.1".into(),
            },
            radios: Vec::new(),
        }
    }

    #[test]
    fn band_mapping() {
        assert_eq!(map_band("2.4GHz"), Band::Bgn);
        assert_eq!(map_band("5GHz"), Band::Ac);
        for other in ["6GHz", "5ghz", "", "2.4"] {
            assert_eq!(map_band(other), Band::Unknown, "band {other:?}");
        }
    }

    #[test]
    fn unparsable_channels_become_sentinel() {
        let r = Radio::from(radio("5GHz", "auto", ""));
        assert_eq!(r.channel, -1);
        assert_eq!(r.channel_width, -1);

        let r = Radio::from(radio("5GHz", "36", "80"));
        assert_eq!(r.channel, 36);
        assert_eq!(r.channel_width, 80);
    }

    #[test]
    fn throughput_is_converted_to_bits() {
        let r = Radio::from(RadioResponse {
            rx_avg: 500,
            tx_avg: 20,
            ..radio("2.4GHz", "6", "20")
        });
        assert_eq!(r.rx_bps, 500_000);
        assert_eq!(r.tx_bps, 20_000);

        let r = Radio::from(RadioResponse {
            rx_avg: i64::MAX,
            ..RadioResponse::default()
        });
        assert_eq!(r.rx_bps, i64::MAX);
    }

    #[test]
    fn online_device_has_only_uptime() {
        let d = Device::from(device(true));
        assert_eq!(d.availability.up_since(), DateTime::from_timestamp(60, 0));
        assert_eq!(d.availability.down_since(), None);
    }

    #[test]
    fn offline_device_has_only_downtime() {
        let d = Device::from(device(false));
        assert_eq!(d.availability.up_since(), None);
        assert_eq!(
            d.availability.down_since(),
            DateTime::from_timestamp(120, 0)
        );
    }

    #[test]
    fn identity_fields_are_copied() {
        let d = Device::from(device(true));
        assert_eq!(d.hostname, "ap-lobby");
        assert_eq!(d.firmware, "6.5.1");
        assert_eq!(d.site, "HQ");
        assert_eq!(d.serial, "SN1");
        assert!(d.last_reboot.is_none());
    }

    #[test]
    fn latest_reboot_is_selected() {
        let mut raw = device(true);
        raw.system.reboots = [(100, "a"), (300, "b"), (200, "c")]
            .into_iter()
            .map(|(timestamp, reason)| RebootResponse {
                timestamp,
                reason: reason.into(),
            })
            .collect();

        let reboot = Device::from(raw).last_reboot.unwrap();
        assert_eq!(reboot.at.timestamp(), 300);
        assert_eq!(reboot.reason, "b");
    }

    #[test]
    fn reboot_ties_keep_first_record() {
        let reboots = vec![
            RebootResponse {
                timestamp: 5,
                reason: "first".into(),
            },
            RebootResponse {
                timestamp: 5,
                reason: "second".into(),
            },
        ];
        assert_eq!(latest_reboot(&reboots).unwrap().reason, "first");
    }

    #[test]
    fn portal_aggregate_keeps_counts() {
        let mut counts = PortalSessionCounts::default();
        counts.per_device.insert("aa".into(), 2);
        counts.per_device.insert("bb".into(), 1);
        counts.total = 3;

        let agg = portal_aggregate("lobby", counts);
        assert_eq!(agg.portal, "lobby");
        assert_eq!(agg.total, 3);
        assert_eq!(agg.counted(), 3);
    }
}
