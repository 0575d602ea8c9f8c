// Authentication state shared between the refresh task and scrapes
//
// The cookie jar is the single store for both the session cookie and the
// CSRF cookie. Installing a session takes the write half of the lock;
// request paths hold the read half from header construction until the
// response arrives.

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::debug;
use url::Url;

use crate::auth::AuthInfo;

/// Name of the session identifier cookie.
pub const SESSION_COOKIE: &str = "sid";
/// Name of the cookie carrying the CSRF token.
pub const CSRF_COOKIE: &str = "XSRF-TOKEN";

/// Cookie store + CSRF token for one controller instance.
pub struct Session {
    base_url: Url,
    jar: Arc<Jar>,
    /// Guards installs into the jar. Holds no data of its own.
    install_lock: RwLock<()>,
}

impl Session {
    /// Create an empty session scoped to the controller's base URL.
    pub fn new(base_url: Url) -> Self {
        Self::with_jar(base_url, Arc::new(Jar::default()))
    }

    /// Create a session around an existing cookie jar.
    pub fn with_jar(base_url: Url, jar: Arc<Jar>) -> Self {
        Self {
            base_url,
            jar,
            install_lock: RwLock::new(()),
        }
    }

    /// The controller base URL the cookies are scoped to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Replace the session cookie and CSRF token in one step.
    ///
    /// An empty `csrf_token` expires any previously stored token.
    pub async fn install(&self, info: &AuthInfo) {
        let _guard = self.install_lock.write().await;

        self.jar.add_cookie_str(
            &format!("{SESSION_COOKIE}={}; Path=/", info.session_id),
            &self.base_url,
        );

        if info.csrf_token.is_empty() {
            let expired = format!(
                "{CSRF_COOKIE}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT"
            );
            self.jar.add_cookie_str(&expired, &self.base_url);
        } else {
            self.jar.add_cookie_str(
                &format!("{CSRF_COOKIE}={}; Path=/", info.csrf_token),
                &self.base_url,
            );
        }

        debug!("session installed");
    }

    /// Current CSRF token, or an empty string if none is set.
    pub async fn csrf_token(&self) -> String {
        self.read().await.csrf_token()
    }

    /// Whether a session cookie is present.
    pub async fn has_session(&self) -> bool {
        let _guard = self.install_lock.read().await;
        self.cookie(SESSION_COOKIE).is_some()
    }

    /// Hold the read half of the session lock.
    pub async fn read(&self) -> SessionReadGuard<'_> {
        SessionReadGuard {
            session: self,
            _guard: self.install_lock.read().await,
        }
    }

    /// Store the `Set-Cookie` values of a response to `url`.
    pub fn store_cookies(&self, url: &Url, set_cookies: &[String]) {
        for cookie in set_cookies {
            self.jar.add_cookie_str(cookie, url);
        }
    }

    /// Look up a cookie value for the base URL.
    fn cookie(&self, name: &str) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        let header = header.to_str().ok()?;
        cookie_value(header, name).map(String::from)
    }
}

/// Read access to the session while the lock is held.
pub struct SessionReadGuard<'a> {
    session: &'a Session,
    _guard: RwLockReadGuard<'a, ()>,
}

impl SessionReadGuard<'_> {
    /// Current CSRF token, or an empty string if none is set.
    pub fn csrf_token(&self) -> String {
        self.session.cookie(CSRF_COOKIE).unwrap_or_default()
    }

    /// `Cookie:` header value for a request to `url`, if any cookie applies.
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let header = self.session.jar.cookies(url)?;
        header.to_str().ok().map(String::from)
    }
}

/// Extract a single cookie from a `Cookie:` header value.
fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}
