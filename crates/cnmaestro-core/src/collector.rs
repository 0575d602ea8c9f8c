// ── Per-scrape metric collection ──
//
// Every scrape fetches fresh data: the group summary, then the device list
// (or the paged portal sessions), normalizes it and fills a new registry.
// Any upstream failure collapses the result to a single `up 0` sample.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use prometheus::proto::MetricFamily;
use tracing::{debug, error, warn};

use cnmaestro_api::ApiClient;
use cnmaestro_api::pagination::Paginator;

use crate::convert::portal_aggregate;
use crate::error::CoreError;
use crate::metrics::{FleetMetrics, PortalMetrics};
use crate::model::{Device, FleetSnapshot, PortalSessionAggregate};

/// Pulls controller data on demand and turns it into metric families.
#[derive(Clone)]
pub struct MetricsCollector {
    client: ApiClient,
    paginator: Paginator,
}

impl MetricsCollector {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            paginator: Paginator::default(),
        }
    }

    /// Use a different page size or page bound for portal sessions.
    pub fn with_paginator(mut self, paginator: Paginator) -> Self {
        self.paginator = paginator;
        self
    }

    // ── Listings ─────────────────────────────────────────────────────

    pub async fn list_ap_groups(&self) -> Result<Vec<String>, CoreError> {
        Ok(self.client.list_ap_groups().await?)
    }

    pub async fn list_portals(&self) -> Result<Vec<String>, CoreError> {
        Ok(self.client.list_portals().await?)
    }

    // ── Snapshots ────────────────────────────────────────────────────

    /// Fetch the summary of an AP group, then its devices.
    ///
    /// The device list is only requested once the summary succeeded.
    pub async fn fleet_snapshot(&self, group: &str) -> Result<FleetSnapshot, CoreError> {
        let summary = self
            .client
            .get_ap_group(group)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity_type: "AP group".into(),
                identifier: group.to_owned(),
            })?;

        let devices: Vec<Device> = self
            .client
            .list_devices(group)
            .await?
            .into_iter()
            .map(Device::from)
            .collect();

        debug!(group, devices = devices.len(), "fleet snapshot fetched");
        Ok(FleetSnapshot {
            summary: summary.into(),
            devices,
        })
    }

    /// Fetch all session pages of a guest portal.
    pub async fn portal_snapshot(&self, portal: &str) -> Result<PortalSessionAggregate, CoreError> {
        let counts = self
            .client
            .portal_session_counts_with(portal, self.paginator)
            .await?;
        let aggregate = portal_aggregate(portal, counts);

        let counted = aggregate.counted();
        if counted != aggregate.total {
            warn!(
                portal,
                counted,
                total = aggregate.total,
                "portal session count differs from reported total"
            );
        }
        Ok(aggregate)
    }

    // ── Scrapes ──────────────────────────────────────────────────────

    /// Collect the metrics of one AP group within `deadline`.
    ///
    /// Upstream failures are not errors: they yield only `up 0`.
    /// `Err` means the metric families themselves could not be built.
    pub async fn collect_fleet_metrics(
        &self,
        group: &str,
        deadline: Duration,
    ) -> Result<Vec<MetricFamily>, CoreError> {
        debug!(group, "collecting fleet metrics");
        let metrics = FleetMetrics::new()?;

        match within(deadline, self.fleet_snapshot(group)).await {
            Ok(snapshot) => metrics.record(&snapshot, Utc::now()),
            Err(e) => {
                error!(group, error = %e, "fetching AP group data failed");
                metrics.record_failure();
            }
        }
        Ok(metrics.gather())
    }

    /// Collect the session metrics of one guest portal within `deadline`.
    pub async fn collect_portal_metrics(
        &self,
        portal: &str,
        deadline: Duration,
    ) -> Result<Vec<MetricFamily>, CoreError> {
        debug!(portal, "collecting portal metrics");
        let metrics = PortalMetrics::new()?;

        match within(deadline, self.portal_snapshot(portal)).await {
            Ok(aggregate) => metrics.record(&aggregate),
            Err(e) => {
                error!(portal, error = %e, "fetching portal data failed");
                metrics.record_failure();
            }
        }
        Ok(metrics.gather())
    }
}

/// Run `fut` with a deadline. Expiry drops the future, aborting its requests.
async fn within<T, F>(deadline: Duration, fut: F) -> Result<T, CoreError>
where
    F: Future<Output = Result<T, CoreError>>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| CoreError::Timeout {
            timeout_secs: deadline.as_secs(),
        })?
}
