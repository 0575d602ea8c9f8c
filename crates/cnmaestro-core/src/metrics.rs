// ── Prometheus metric families ──
//
// A fresh registry is built for every scrape, filled from one snapshot and
// gathered once. Label vectors that received no samples are pruned by
// `Registry::gather`, so a failed scrape exposes only `up`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use tracing::warn;

use crate::error::CoreError;
use crate::model::{FleetSnapshot, PortalSessionAggregate};

pub const NAMESPACE: &str = "cambium_maestro";

/// `Content-Type` of [`encode_text`] output.
pub const TEXT_CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

const GROUP_LABELS: &[&str] = &["name"];
const RADIO_LABELS: &[&str] = &["apgroup", "ap", "band"];

// ── Builders ─────────────────────────────────────────────────────────

fn up_gauge(registry: &Registry) -> Result<Gauge, prometheus::Error> {
    let gauge = Gauge::with_opts(
        Opts::new("up", "indicator whether cloud controller is reachable").namespace(NAMESPACE),
    )?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

fn gauge_vec(
    registry: &Registry,
    subsystem: &str,
    name: &str,
    help: &str,
    labels: &[&str],
) -> Result<GaugeVec, prometheus::Error> {
    let opts = Opts::new(name, help)
        .namespace(NAMESPACE)
        .subsystem(subsystem);
    let vec = GaugeVec::new(opts, labels)?;
    registry.register(Box::new(vec.clone()))?;
    Ok(vec)
}

fn ap_gauge(
    registry: &Registry,
    name: &str,
    help: &str,
    extra: &[&str],
) -> Result<GaugeVec, prometheus::Error> {
    let labels: Vec<&str> = ["apgroup", "mac"].iter().chain(extra).copied().collect();
    gauge_vec(registry, "ap", name, help, &labels)
}

fn radio_gauge(
    registry: &Registry,
    name: &str,
    help: &str,
    extra: &[&str],
) -> Result<GaugeVec, prometheus::Error> {
    let labels: Vec<&str> = RADIO_LABELS.iter().chain(extra).copied().collect();
    gauge_vec(registry, "ap_radio", name, help, &labels)
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn seconds_since(now: DateTime<Utc>, then: DateTime<Utc>) -> f64 {
    (now - then).num_milliseconds() as f64 / 1000.0
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn int(v: i64) -> f64 {
    v as f64
}

#[allow(clippy::cast_precision_loss, clippy::as_conversions)]
fn count(v: u64) -> f64 {
    v as f64
}

// ── Fleet ────────────────────────────────────────────────────────────

/// Gauges describing one AP group and its access points.
pub struct FleetMetrics {
    registry: Registry,
    up: Gauge,

    devices_count: GaugeVec,
    devices_offline: GaugeVec,
    devices_out_of_sync: GaugeVec,
    client_count: GaugeVec,
    client_count_24h: GaugeVec,

    ap_up: GaugeVec,
    ap_uptime: GaugeVec,
    ap_downtime: GaugeVec,
    ap_reboot: GaugeVec,

    radio_channel: GaugeVec,
    radio_channel_width: GaugeVec,
    radio_power: GaugeVec,
    radio_quality: GaugeVec,
    radio_transfer_rate: GaugeVec,
}

impl FleetMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let r = &registry;
        let group = |name, help| gauge_vec(r, "ap_group", name, help, GROUP_LABELS);

        Ok(Self {
            up: up_gauge(r)?,

            devices_count: group("devices_count", "number of adopted devices")?,
            devices_offline: group("devices_offline_count", "number of offline devices")?,
            devices_out_of_sync: group(
                "devices_out_of_sync_count",
                "number of devices with old configuration",
            )?,
            client_count: group("client_count", "number of currently connected clients")?,
            client_count_24h: group(
                "client_count_24h",
                "number of clients seen in the past 24 hours",
            )?,

            ap_up: ap_gauge(
                r,
                "up",
                "details for AP",
                &["model", "hostname", "serial", "site", "firmware"],
            )?,
            ap_uptime: ap_gauge(r, "uptime", "number of uptime seconds", &[])?,
            ap_downtime: ap_gauge(r, "downtime", "number of downtime seconds", &[])?,
            ap_reboot: ap_gauge(
                r,
                "reboot",
                "number of seconds since last reboot",
                &["reason"],
            )?,

            radio_channel: radio_gauge(r, "channel", "WiFi channel number", &[])?,
            radio_channel_width: radio_gauge(r, "channel_width", "WiFi channel width in MHz", &[])?,
            radio_power: radio_gauge(r, "power", "RF transmit power", &[])?,
            radio_quality: radio_gauge(
                r,
                "quality",
                "RF quality measurement in percentage points",
                &[],
            )?,
            radio_transfer_rate: radio_gauge(
                r,
                "transfer_rate",
                "current traffic rate in bps",
                &["direction"],
            )?,

            registry,
        })
    }

    /// Mark the controller unreachable. Nothing else is recorded.
    pub fn record_failure(&self) {
        self.up.set(0.0);
    }

    /// Record a complete snapshot; durations are measured against `now`.
    pub fn record(&self, snapshot: &FleetSnapshot, now: DateTime<Utc>) {
        self.up.set(1.0);

        let g = &snapshot.summary;
        let name = [g.name.as_str()];
        self.devices_count.with_label_values(&name).set(int(g.device_count));
        self.devices_offline.with_label_values(&name).set(int(g.offline_count));
        self.devices_out_of_sync
            .with_label_values(&name)
            .set(int(g.out_of_sync_count));
        self.client_count.with_label_values(&name).set(int(g.client_count));
        self.client_count_24h
            .with_label_values(&name)
            .set(int(g.client_count_24h));

        for dev in &snapshot.devices {
            let ap = [g.name.as_str(), dev.mac.as_str()];
            self.ap_up
                .with_label_values(&[
                    ap[0],
                    ap[1],
                    &dev.model,
                    &dev.hostname,
                    &dev.serial,
                    &dev.site,
                    &dev.firmware,
                ])
                .set(1.0);

            if let Some(since) = dev.availability.up_since() {
                self.ap_uptime.with_label_values(&ap).set(seconds_since(now, since));
            }
            if let Some(since) = dev.availability.down_since() {
                self.ap_downtime
                    .with_label_values(&ap)
                    .set(seconds_since(now, since));
            }
            if let Some(reboot) = &dev.last_reboot {
                self.ap_reboot
                    .with_label_values(&[ap[0], ap[1], &reboot.reason])
                    .set(seconds_since(now, reboot.at));
            }

            // Radio series are keyed by (ap, band); later radios on a seen
            // band are dropped.
            let mut bands = HashSet::with_capacity(dev.radios.len());
            for (index, radio) in dev.radios.iter().enumerate() {
                if !bands.insert(radio.band) {
                    warn!(
                        mac = %dev.mac,
                        band = %radio.band,
                        radio = index,
                        channel = radio.channel,
                        "duplicate radio band, skipping radio"
                    );
                    continue;
                }
                let labels = [ap[0], ap[1], radio.band.as_ref()];
                self.radio_channel
                    .with_label_values(&labels)
                    .set(f64::from(radio.channel));
                self.radio_channel_width
                    .with_label_values(&labels)
                    .set(f64::from(radio.channel_width));
                self.radio_power.with_label_values(&labels).set(int(radio.power));
                self.radio_quality
                    .with_label_values(&labels)
                    .set(int(radio.quality));
                self.radio_transfer_rate
                    .with_label_values(&[labels[0], labels[1], labels[2], "out"])
                    .set(int(radio.tx_bps));
                self.radio_transfer_rate
                    .with_label_values(&[labels[0], labels[1], labels[2], "in"])
                    .set(int(radio.rx_bps));
            }
        }
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

// ── Guest portal ─────────────────────────────────────────────────────

/// Gauges describing the active sessions of one guest portal.
pub struct PortalMetrics {
    registry: Registry,
    up: Gauge,
    sessions: GaugeVec,
    ap_sessions: GaugeVec,
}

impl PortalMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        Ok(Self {
            up: up_gauge(&registry)?,
            sessions: gauge_vec(
                &registry,
                "",
                "sessions_count",
                "number of active sessions",
                &["name"],
            )?,
            ap_sessions: gauge_vec(
                &registry,
                "ap",
                "sessions_count",
                "number of active sessions",
                &["portal", "mac"],
            )?,
            registry,
        })
    }

    pub fn record_failure(&self) {
        self.up.set(0.0);
    }

    pub fn record(&self, aggregate: &PortalSessionAggregate) {
        self.up.set(1.0);
        self.sessions
            .with_label_values(&[&aggregate.portal])
            .set(count(aggregate.total));
        for (mac, sessions) in &aggregate.per_device {
            self.ap_sessions
                .with_label_values(&[&aggregate.portal, mac])
                .set(count(*sessions));
        }
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }
}

/// Render metric families in the Prometheus text exposition format.
pub fn encode_text(families: &[MetricFamily]) -> Result<String, CoreError> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| CoreError::Metrics(prometheus::Error::Msg(e.to_string())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;

    use super::*;
    use crate::model::{ApGroupSummary, Availability, Band, Device, Radio, RebootEvent};

    fn value(families: &[MetricFamily], name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        families
            .iter()
            .find(|f| f.get_name() == name)?
            .get_metric()
            .iter()
            .find(|m| {
                labels.iter().all(|(k, v)| {
                    m.get_label()
                        .iter()
                        .any(|l| l.get_name() == *k && l.get_value() == *v)
                })
            })
            .map(|m| m.get_gauge().get_value())
    }

    fn names(families: &[MetricFamily]) -> Vec<&str> {
        families.iter().map(MetricFamily::get_name).collect()
    }

    #[test]
    fn failure_exposes_only_up() {
        let m = FleetMetrics::new().unwrap();
        m.record_failure();
        let families = m.gather();

        assert_eq!(names(&families), vec!["cambium_maestro_up"]);
        assert_eq!(value(&families, "cambium_maestro_up", &[]), Some(0.0));
    }

    #[test]
    fn snapshot_is_recorded() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let snapshot = FleetSnapshot {
            summary: ApGroupSummary {
                name: "hq".into(),
                device_count: 2,
                client_count_24h: 7,
                ..ApGroupSummary::default()
            },
            devices: vec![Device {
                mac: "aa:bb".into(),
                serial: "SN1".into(),
                model: "XV3-8".into(),
                site: "HQ".into(),
                hostname: "ap-1".into(),
                firmware: "6.5".into(),
                availability: Availability::Down {
                    since: now - chrono::Duration::seconds(90),
                },
                last_reboot: Some(RebootEvent {
                    at: now - chrono::Duration::seconds(3600),
                    reason: "watchdog".into(),
                }),
                radios: vec![Radio {
                    band: Band::Ac,
                    channel: 36,
                    channel_width: -1,
                    power: 20,
                    quality: 95,
                    rx_bps: 500_000,
                    tx_bps: 1_000,
                }],
            }],
        };

        let m = FleetMetrics::new().unwrap();
        m.record(&snapshot, now);
        let f = m.gather();

        assert_eq!(value(&f, "cambium_maestro_up", &[]), Some(1.0));
        assert_eq!(
            value(&f, "cambium_maestro_ap_group_devices_count", &[("name", "hq")]),
            Some(2.0)
        );
        assert_eq!(
            value(&f, "cambium_maestro_ap_group_client_count_24h", &[("name", "hq")]),
            Some(7.0)
        );
        assert_eq!(
            value(
                &f,
                "cambium_maestro_ap_up",
                &[("mac", "aa:bb"), ("hostname", "ap-1"), ("firmware", "6.5")]
            ),
            Some(1.0)
        );
        assert_eq!(
            value(&f, "cambium_maestro_ap_downtime", &[("mac", "aa:bb")]),
            Some(90.0)
        );
        assert!(!names(&f).contains(&"cambium_maestro_ap_uptime"));
        assert_eq!(
            value(&f, "cambium_maestro_ap_reboot", &[("reason", "watchdog")]),
            Some(3600.0)
        );
        assert_eq!(
            value(
                &f,
                "cambium_maestro_ap_radio_channel_width",
                &[("ap", "aa:bb"), ("band", "5")]
            ),
            Some(-1.0)
        );
        assert_eq!(
            value(
                &f,
                "cambium_maestro_ap_radio_transfer_rate",
                &[("direction", "in")]
            ),
            Some(500_000.0)
        );
        assert_eq!(
            value(
                &f,
                "cambium_maestro_ap_radio_transfer_rate",
                &[("direction", "out")]
            ),
            Some(1_000.0)
        );
    }

    #[test]
    fn duplicate_band_keeps_first_radio() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let radio = |channel| Radio {
            band: Band::Ac,
            channel,
            channel_width: 80,
            power: 20,
            quality: 90,
            rx_bps: 0,
            tx_bps: 0,
        };
        let snapshot = FleetSnapshot {
            summary: ApGroupSummary {
                name: "hq".into(),
                ..ApGroupSummary::default()
            },
            devices: vec![Device {
                mac: "aa:bb".into(),
                serial: "SN1".into(),
                model: "XV3-8".into(),
                site: "HQ".into(),
                hostname: "ap-1".into(),
                firmware: "6.5".into(),
                availability: Availability::Up { since: now },
                last_reboot: None,
                radios: vec![radio(36), radio(149)],
            }],
        };

        let m = FleetMetrics::new().unwrap();
        m.record(&snapshot, now);
        let f = m.gather();

        let channel = f
            .iter()
            .find(|family| family.get_name() == "cambium_maestro_ap_radio_channel")
            .unwrap();
        assert_eq!(channel.get_metric().len(), 1);
        assert_eq!(
            value(&f, "cambium_maestro_ap_radio_channel", &[("band", "5")]),
            Some(36.0)
        );
        assert_eq!(
            value(&f, "cambium_maestro_ap_up", &[("mac", "aa:bb")]),
            Some(1.0)
        );
    }

    #[test]
    fn portal_sessions_are_recorded() {
        let aggregate = PortalSessionAggregate {
            portal: "lobby".into(),
            per_device: BTreeMap::from([("aa".to_string(), 3), ("bb".to_string(), 1)]),
            total: 4,
        };
        let m = PortalMetrics::new().unwrap();
        m.record(&aggregate);
        let f = m.gather();

        assert_eq!(
            value(&f, "cambium_maestro_sessions_count", &[("name", "lobby")]),
            Some(4.0)
        );
        assert_eq!(
            value(
                &f,
                "cambium_maestro_ap_sessions_count",
                &[("portal", "lobby"), ("mac", "aa")]
            ),
            Some(3.0)
        );
    }

    #[test]
    fn text_encoding() {
        let m = PortalMetrics::new().unwrap();
        m.record_failure();
        let text = encode_text(&m.gather()).unwrap();

        assert!(text.contains("# TYPE cambium_maestro_up gauge"));
        assert!(text.contains("cambium_maestro_up 0"));
        assert!(!text.contains("sessions_count"));
    }
}
