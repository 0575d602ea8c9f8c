// ── Controller facade ──
//
// Wires one `Session` into both the API client (reader) and the session
// manager (writer), and hands out the collector used by scrapes.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use cnmaestro_api::{ApiClient, AuthInfo, Session};

use crate::collector::MetricsCollector;
use crate::config::ControllerConfig;
use crate::error::CoreError;
use crate::session::{RefreshTask, SessionManager};

/// Entry point for the exporter binary.
///
/// Cheaply cloneable.
#[derive(Clone)]
pub struct Controller {
    config: Arc<ControllerConfig>,
    sessions: SessionManager,
    collector: MetricsCollector,
}

impl Controller {
    /// Build the client stack. No network traffic happens here.
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        let session = Arc::new(Session::new(config.url.clone()));
        let client = ApiClient::new(Arc::clone(&session), &config.transport())?;

        let (username, password) = config.login_credentials();
        let sessions = SessionManager::new(
            session,
            config.login_provider(),
            username,
            password,
            config.refresh,
        );

        Ok(Self {
            config: Arc::new(config),
            sessions,
            collector: MetricsCollector::new(client),
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn collector(&self) -> &MetricsCollector {
        &self.collector
    }

    /// Perform the initial login.
    pub async fn connect(&self) -> Result<AuthInfo, CoreError> {
        let info = self.sessions.login().await?;
        info!(url = %self.config.url, "logged in to controller");
        Ok(info)
    }

    /// Start the background session refresh.
    pub fn spawn_refresh(&self, cancel: CancellationToken) -> RefreshTask {
        self.sessions.spawn_refresh(cancel)
    }

    /// AP groups for the index page: the configured list, or all groups
    /// the controller knows if none are configured.
    pub async fn ap_groups(&self) -> Result<Vec<String>, CoreError> {
        if self.config.ap_groups.is_empty() {
            self.collector.list_ap_groups().await
        } else {
            Ok(self.config.ap_groups.clone())
        }
    }
}
