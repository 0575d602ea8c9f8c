#![allow(clippy::unwrap_used)]
// End-to-end scrape tests against a wiremock controller.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use prometheus::proto::MetricFamily;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cnmaestro_api::pagination::Paginator;
use cnmaestro_api::{ApiClient, AuthInfo, Session, TransportConfig};
use cnmaestro_core::{
    AuthCredentials, Controller, ControllerConfig, MetricsCollector, SessionState, encode_text,
};

const DEADLINE: Duration = Duration::from_secs(5);

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, MetricsCollector) {
    let server = MockServer::start().await;
    let session = Arc::new(Session::new(Url::parse(&server.uri()).unwrap()));
    session
        .install(&AuthInfo {
            session_id: "s:1".into(),
            csrf_token: "tok".into(),
        })
        .await;
    let client = ApiClient::new(session, &TransportConfig::default()).unwrap();
    (server, MetricsCollector::new(client))
}

fn families_names(families: &[MetricFamily]) -> Vec<&str> {
    families.iter().map(MetricFamily::get_name).collect()
}

fn gauge(families: &[MetricFamily], name: &str, labels: &[(&str, &str)]) -> Option<f64> {
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

async fn mount_hq_summary(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/0/cn-srv/config/profiles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "profiles": [{
                "name": "hq",
                "deviceCount": 10,
                "offlineCount": 1,
                "clientCount": 42
            }] }
        })))
        .mount(server)
        .await;
}

// ── Fleet scrape ────────────────────────────────────────────────────

#[tokio::test]
async fn test_fleet_scrape_end_to_end() {
    let (server, collector) = setup().await;
    mount_hq_summary(&server).await;

    Mock::given(method("GET"))
        .and(path("/0/cn-srv/stats/profiles/hq/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "profiles": { "devices": [{
                "mac": "aa:bb",
                "sys": { "online": true, "upTime": 60000 },
                "radios": [{ "band": "2.4GHz", "channel": "6", "chWidth": "20", "rxAvg": 500 }]
            }] } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let families = collector
        .collect_fleet_metrics("hq", DEADLINE)
        .await
        .unwrap();

    assert_eq!(gauge(&families, "cambium_maestro_up", &[]), Some(1.0));
    assert_eq!(
        gauge(
            &families,
            "cambium_maestro_ap_group_devices_count",
            &[("name", "hq")]
        ),
        Some(10.0)
    );
    assert_eq!(
        gauge(
            &families,
            "cambium_maestro_ap_group_client_count",
            &[("name", "hq")]
        ),
        Some(42.0)
    );

    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    let expected = (Utc::now().timestamp() - 60) as f64;
    let uptime = gauge(&families, "cambium_maestro_ap_uptime", &[("mac", "aa:bb")]).unwrap();
    assert!((uptime - expected).abs() < 5.0, "uptime {uptime}, expected ~{expected}");

    assert!(!families_names(&families).contains(&"cambium_maestro_ap_downtime"));
    assert_eq!(
        gauge(
            &families,
            "cambium_maestro_ap_radio_transfer_rate",
            &[("ap", "aa:bb"), ("band", "2.4"), ("direction", "in")]
        ),
        Some(500_000.0)
    );
}

#[tokio::test]
async fn test_summary_failure_skips_devices() {
    let (server, collector) = setup().await;

    Mock::given(method("GET"))
        .and(path("/0/cn-srv/config/profiles"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/0/cn-srv/stats/profiles/hq/devices"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let families = collector
        .collect_fleet_metrics("hq", DEADLINE)
        .await
        .unwrap();

    assert_eq!(families_names(&families), vec!["cambium_maestro_up"]);
    assert_eq!(gauge(&families, "cambium_maestro_up", &[]), Some(0.0));
}

#[tokio::test]
async fn test_device_failure_emits_no_partial_metrics() {
    let (server, collector) = setup().await;
    mount_hq_summary(&server).await;

    Mock::given(method("GET"))
        .and(path("/0/cn-srv/stats/profiles/hq/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let families = collector
        .collect_fleet_metrics("hq", DEADLINE)
        .await
        .unwrap();

    assert_eq!(families_names(&families), vec!["cambium_maestro_up"]);
    let text = encode_text(&families).unwrap();
    assert!(text.contains("cambium_maestro_up 0"));
}

#[tokio::test]
async fn test_unknown_group_reports_down() {
    let (server, collector) = setup().await;

    Mock::given(method("GET"))
        .and(path("/0/cn-srv/config/profiles"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": { "profiles": [] } })),
        )
        .mount(&server)
        .await;

    let families = collector
        .collect_fleet_metrics("nope", DEADLINE)
        .await
        .unwrap();
    assert_eq!(gauge(&families, "cambium_maestro_up", &[]), Some(0.0));
}

#[tokio::test]
async fn test_deadline_expiry_reports_down() {
    let (server, collector) = setup().await;

    Mock::given(method("GET"))
        .and(path("/0/cn-srv/config/profiles"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let families = collector
        .collect_fleet_metrics("hq", Duration::from_millis(100))
        .await
        .unwrap();
    assert_eq!(families_names(&families), vec!["cambium_maestro_up"]);
    assert_eq!(gauge(&families, "cambium_maestro_up", &[]), Some(0.0));
}

#[tokio::test]
async fn test_fleet_snapshot_normalizes_devices() {
    let (server, collector) = setup().await;
    mount_hq_summary(&server).await;

    Mock::given(method("GET"))
        .and(path("/0/cn-srv/stats/profiles/hq/devices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "profiles": { "devices": [{
                "mac": "cc:dd",
                "sys": {
                    "online": false,
                    "dnTime": 1000,
                    "lastRbt": [{ "uTs": 100, "code": "a" }, { "uTs": 300, "code": "b" }]
                },
                "radios": [{ "band": "6GHz", "channel": "auto" }]
            }] } }
        })))
        .mount(&server)
        .await;

    let snapshot = collector.fleet_snapshot("hq").await.unwrap();
    assert_eq!(snapshot.summary.device_count, 10);

    let dev = &snapshot.devices[0];
    assert!(dev.availability.down_since().is_some());
    assert_eq!(dev.last_reboot.as_ref().unwrap().reason, "b");
    assert_eq!(dev.radios[0].channel, -1);
    assert_eq!(dev.radios[0].band.as_ref(), "unknown");

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["apgroup"]["name"], "hq");
    assert_eq!(json["devices"][0]["availability"]["state"], "down");
}

// ── Portal scrape ───────────────────────────────────────────────────

#[tokio::test]
async fn test_portal_scrape() {
    let (server, collector) = setup().await;

    Mock::given(method("GET"))
        .and(path("/0/cn-srv/services/guest/session/lobby"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "sessions": [{ "apMac": "aa" }, { "apMac": "aa" }],
                "meta": { "total": 3 }
            }
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/0/cn-srv/services/guest/session/lobby"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "sessions": [{ "apMac": "bb" }], "meta": { "total": 3 } }
        })))
        .mount(&server)
        .await;

    let collector = collector.with_paginator(Paginator::new(2));
    let families = collector
        .collect_portal_metrics("lobby", DEADLINE)
        .await
        .unwrap();

    assert_eq!(gauge(&families, "cambium_maestro_up", &[]), Some(1.0));
    assert_eq!(
        gauge(
            &families,
            "cambium_maestro_sessions_count",
            &[("name", "lobby")]
        ),
        Some(3.0)
    );
    assert_eq!(
        gauge(
            &families,
            "cambium_maestro_ap_sessions_count",
            &[("portal", "lobby"), ("mac", "aa")]
        ),
        Some(2.0)
    );
    assert_eq!(
        gauge(
            &families,
            "cambium_maestro_ap_sessions_count",
            &[("portal", "lobby"), ("mac", "bb")]
        ),
        Some(1.0)
    );
}

#[tokio::test]
async fn test_portal_failure_reports_down() {
    let (server, collector) = setup().await;

    Mock::given(method("GET"))
        .and(path("/0/cn-srv/services/guest/session/lobby"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let families = collector
        .collect_portal_metrics("lobby", DEADLINE)
        .await
        .unwrap();
    assert_eq!(families_names(&families), vec!["cambium_maestro_up"]);
    assert_eq!(gauge(&families, "cambium_maestro_up", &[]), Some(0.0));
}

// ── Controller ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_controller_static_session_login() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/0/cn-srv/services/guest/portal"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "result": [{ "name": "lobby" }] }
        })))
        .mount(&server)
        .await;

    let config = ControllerConfig::new(
        Url::parse(&server.uri()).unwrap(),
        AuthCredentials::SessionId {
            session_id: SecretString::from("s:abc".to_string()),
            xsrf_token: Some("tok".into()),
        },
    );
    let controller = Controller::new(config).unwrap();
    assert_eq!(
        controller.sessions().state(),
        SessionState::Unauthenticated
    );

    let info = controller.connect().await.unwrap();
    assert_eq!(info.session_id, "s:abc");
    assert_eq!(controller.sessions().state(), SessionState::Authenticated);
    assert_eq!(controller.sessions().csrf_token().await, "tok");

    let portals = controller.collector().list_portals().await.unwrap();
    assert_eq!(portals, vec!["lobby"]);
}

#[tokio::test]
async fn test_controller_uses_configured_groups() {
    let mut config = ControllerConfig::new(
        Url::parse("http://127.0.0.1:1").unwrap(),
        AuthCredentials::SessionId {
            session_id: SecretString::from("s:abc".to_string()),
            xsrf_token: None,
        },
    );
    config.ap_groups = vec!["hq".into()];

    let controller = Controller::new(config).unwrap();
    assert_eq!(controller.ap_groups().await.unwrap(), vec!["hq"]);
}
