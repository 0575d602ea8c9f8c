// ── Runtime connection configuration ──
//
// These types describe how to reach a cnMaestro controller and how to keep
// the session alive. They carry credential data but never touch disk; the
// binary builds a `ControllerConfig` from `cnmaestro-config` and hands it in.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use cnmaestro_api::{
    FormLoginProvider, LoginProvider, StaticSessionProvider, TlsMode, TransportConfig,
};

/// How to obtain a controller session.
#[derive(Debug, Clone)]
pub enum AuthCredentials {
    /// Session copied from a logged-in browser.
    SessionId {
        session_id: SecretString,
        xsrf_token: Option<String>,
    },
    /// Username and password for the login form.
    Credentials {
        username: String,
        password: SecretString,
    },
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification.
    DangerAcceptInvalid,
}

/// Session refresh schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Delay between refreshes while logins succeed.
    pub interval: Duration,
    /// Delay after a failed refresh.
    pub retry_interval: Duration,
    /// Consecutive failures tolerated before giving up.
    pub max_failures: u32,
    /// Deadline of a single login attempt.
    pub login_timeout: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(6 * 60 * 60),
            retry_interval: Duration::from_secs(30 * 60),
            max_failures: 24,
            login_timeout: Duration::from_secs(20),
        }
    }
}

/// Everything needed to talk to one controller instance.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Base URL, e.g. `https://eu-west.cloud.cambiumnetworks.com`.
    pub url: Url,
    pub auth: AuthCredentials,
    pub tls: TlsVerification,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// AP groups shown on the index page. Empty means ask the controller.
    pub ap_groups: Vec<String>,
    pub refresh: RefreshPolicy,
}

impl ControllerConfig {
    pub fn new(url: Url, auth: AuthCredentials) -> Self {
        Self {
            url,
            auth,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            ap_groups: Vec::new(),
            refresh: RefreshPolicy::default(),
        }
    }

    /// Transport settings for the API client and the login form.
    pub fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
            cookie_jar: None,
        }
    }

    /// The login provider matching the configured credentials.
    pub fn login_provider(&self) -> Arc<dyn LoginProvider> {
        match &self.auth {
            AuthCredentials::SessionId {
                session_id,
                xsrf_token,
            } => Arc::new(StaticSessionProvider::new(
                session_id.clone(),
                xsrf_token.clone(),
            )),
            AuthCredentials::Credentials { .. } => {
                Arc::new(FormLoginProvider::new(self.url.clone(), self.transport()))
            }
        }
    }

    /// Username and password handed to the login provider.
    ///
    /// Empty for pre-established sessions.
    pub fn login_credentials(&self) -> (String, SecretString) {
        match &self.auth {
            AuthCredentials::Credentials { username, password } => {
                (username.clone(), password.clone())
            }
            AuthCredentials::SessionId { .. } => (String::new(), SecretString::from(String::new())),
        }
    }
}
