// Guest access endpoints
//
// Portal listing and the paginated active-session listing per portal.

use std::collections::BTreeMap;

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{PortalListData, SessionPageData};
use crate::pagination::{DEFAULT_PAGE_SIZE, Page, Paginator};

/// Number of portals requested by [`ApiClient::list_portals`].
const PORTAL_LIST_LIMIT: u32 = 100;

/// Active guest sessions of one portal, counted per serving AP.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortalSessionCounts {
    /// Session count keyed by AP MAC address.
    pub per_device: BTreeMap<String, u64>,
    /// Total reported by the server.
    pub total: u64,
    /// Number of pages fetched.
    pub pages: u64,
}

impl ApiClient {
    /// List the names of configured guest portals.
    ///
    /// `GET /services/guest/portal?limit=100&offset=0`
    pub async fn list_portals(&self) -> Result<Vec<String>, Error> {
        debug!("listing guest portals");
        let data: PortalListData = self
            .get(
                "/services/guest/portal",
                &[
                    ("limit", PORTAL_LIST_LIMIT.to_string()),
                    ("offset", "0".into()),
                ],
            )
            .await?;
        Ok(data.portals.into_iter().map(|p| p.name).collect())
    }

    /// Fetch one page of active sessions for a portal.
    ///
    /// `GET /services/guest/session/{portal}?limit=..&offset=..`
    pub async fn get_portal_sessions_page(
        &self,
        portal: &str,
        limit: u64,
        offset: u64,
    ) -> Result<SessionPageData, Error> {
        let path = format!("/services/guest/session/{portal}");
        self.get(
            &path,
            &[("limit", limit.to_string()), ("offset", offset.to_string())],
        )
        .await
    }

    /// Fetch all session pages of a portal and count sessions per AP.
    pub async fn portal_session_counts(&self, portal: &str) -> Result<PortalSessionCounts, Error> {
        self.portal_session_counts_with(portal, Paginator::new(DEFAULT_PAGE_SIZE))
            .await
    }

    /// Like [`portal_session_counts`](Self::portal_session_counts) with a
    /// caller-chosen paginator.
    pub async fn portal_session_counts_with(
        &self,
        portal: &str,
        paginator: Paginator,
    ) -> Result<PortalSessionCounts, Error> {
        debug!(portal, "fetching portal sessions");
        let result = paginator
            .run(|limit, offset| async move {
                let data = self.get_portal_sessions_page(portal, limit, offset).await?;
                Ok(Page {
                    items: data.sessions,
                    total: data.meta.total,
                })
            })
            .await?;

        let mut per_device = BTreeMap::new();
        for session in result.items {
            *per_device.entry(session.device_mac).or_insert(0) += 1;
        }

        Ok(PortalSessionCounts {
            per_device,
            total: result.total,
            pages: result.pages,
        })
    }
}
