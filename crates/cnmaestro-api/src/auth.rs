// Login providers
//
// The controller's login is an SSO form flow that ends with a `sid`
// session cookie and an `XSRF-TOKEN` cookie. How those cookies are obtained
// is pluggable behind `LoginProvider`; the session layer only consumes
// the resulting `AuthInfo`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::client::body_preview;
use crate::error::Error;
use crate::session::{CSRF_COOKIE, SESSION_COOKIE};
use crate::transport::TransportConfig;

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthInfo {
    /// Value of the `sid` session cookie.
    pub session_id: String,
    /// Value of the `XSRF-TOKEN` cookie. Empty if none was issued.
    pub csrf_token: String,
}

/// Exchanges credentials for a controller session.
#[async_trait]
pub trait LoginProvider: Send + Sync {
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
        timeout: Duration,
    ) -> Result<AuthInfo, Error>;
}

// ── Static session ──────────────────────────────────────────────────

/// Hands out a pre-established session copied from a logged-in browser.
///
/// Credentials are ignored; every login returns the same cookies.
#[derive(Debug, Clone)]
pub struct StaticSessionProvider {
    session_id: SecretString,
    csrf_token: Option<String>,
}

impl StaticSessionProvider {
    pub fn new(session_id: SecretString, csrf_token: Option<String>) -> Self {
        Self {
            session_id,
            csrf_token,
        }
    }
}

#[async_trait]
impl LoginProvider for StaticSessionProvider {
    async fn login(
        &self,
        _username: &str,
        _password: &SecretString,
        _timeout: Duration,
    ) -> Result<AuthInfo, Error> {
        let session_id = self.session_id.expose_secret();
        if session_id.is_empty() {
            return Err(Error::Login {
                message: "no session id configured".into(),
            });
        }
        Ok(AuthInfo {
            session_id: session_id.to_owned(),
            csrf_token: self.csrf_token.clone().unwrap_or_default(),
        })
    }
}

// ── Form login ──────────────────────────────────────────────────────

/// Submits the controller's login form and harvests the issued cookies.
///
/// `POST {instance}/login` with `email`, `password` and `remember`; the
/// response (after redirects) carries `sid` and `XSRF-TOKEN` cookies.
pub struct FormLoginProvider {
    instance: Url,
    transport: TransportConfig,
}

impl FormLoginProvider {
    pub fn new(instance: Url, transport: TransportConfig) -> Self {
        Self {
            instance,
            transport,
        }
    }
}

#[async_trait]
impl LoginProvider for FormLoginProvider {
    async fn login(
        &self,
        username: &str,
        password: &SecretString,
        timeout: Duration,
    ) -> Result<AuthInfo, Error> {
        // Fresh jar per attempt.
        let jar = Arc::new(Jar::default());
        let mut transport = self.transport.clone().with_timeout(timeout);
        transport.cookie_jar = Some(Arc::clone(&jar));
        let http = transport.build_client()?;

        let url = self.instance.join("/login")?;
        debug!("logging in at {}", url);

        let resp = http
            .post(url)
            .form(&[
                ("email", username),
                ("password", password.expose_secret()),
                ("remember", "on"),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout {
                        timeout_secs: timeout.as_secs(),
                    }
                } else {
                    Error::Transport(e)
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Login {
                message: format!("login failed (HTTP {status}): {}", body_preview(&body)),
            });
        }

        let cookies = jar
            .cookies(&self.instance)
            .and_then(|h| h.to_str().ok().map(String::from))
            .unwrap_or_default();

        let mut info = AuthInfo {
            session_id: String::new(),
            csrf_token: String::new(),
        };
        for (name, value) in cookies
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
        {
            match name {
                SESSION_COOKIE => info.session_id = value.to_owned(),
                CSRF_COOKIE => info.csrf_token = value.to_owned(),
                _ => {}
            }
        }

        if info.session_id.is_empty() {
            return Err(Error::Authentication {
                message: "login response did not set a session cookie".into(),
            });
        }

        debug!("login successful");
        Ok(info)
    }
}
