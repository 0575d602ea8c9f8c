// cnMaestro API HTTP client
//
// Controller-specific URL construction, header injection and envelope
// decoding on top of a `ureq::Agent`. Requests run on the blocking pool;
// cookies are read from and written back to the shared `Session` jar.
// Endpoint modules (profiles, devices, guest) are inherent methods in
// separate files.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use crate::error::Error;
use crate::models::Envelope;
use crate::session::Session;
use crate::transport::TransportConfig;

/// Path prefix of every API endpoint.
pub const API_PREFIX: &str = "/0/cn-srv";

/// Identity-check endpoint. Answers without a CSRF token and sets the
/// CSRF cookie on first contact.
pub const USER_ME_PATH: &str = "/user/me";

/// Marker header the web UI sends on every API call.
pub const CIDX_HEADER: &str = "x-cidx";

/// Header carrying the CSRF token.
pub const XSRF_HEADER: &str = "X-XSRF-TOKEN";

/// A fully read API response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Raw HTTP client for the controller's REST API.
///
/// All requests are GETs under [`API_PREFIX`]. Cookies come from the
/// shared [`Session`]; the CSRF token is attached whenever one is known.
/// Header names are sent with the exact spelling of the constants above.
#[derive(Clone)]
pub struct ApiClient {
    agent: ureq::Agent,
    session: Arc<Session>,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(session: Arc<Session>, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            agent: transport.build_agent()?,
            session,
            timeout: transport.timeout,
        })
    }

    /// The shared authentication state.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}{API_PREFIX}/{path}`.
    ///
    /// A missing leading slash on `path` is added; characters that are
    /// not valid in a path (spaces, `?`, `#`) are percent-encoded.
    pub fn api_url(&self, path: &str) -> Url {
        let mut url = self.session.base_url().clone();
        let sep = if path.starts_with('/') { "" } else { "/" };
        url.set_path(&format!("{API_PREFIX}{sep}{path}"));
        url.set_query(None);
        url
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Issue an authenticated GET and read the whole response.
    ///
    /// Non-2xx statuses are returned as-is; only transport failures are
    /// errors here. No retries. `Set-Cookie` headers land in the session.
    pub async fn fetch(&self, path: &str, query: &[(&str, String)]) -> Result<RawResponse, Error> {
        let mut url = self.api_url(path);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        let session = self.session.read().await;
        let mut req = self
            .agent
            .get(url.as_str())
            .set("accept", "application/json")
            .set(CIDX_HEADER, "0");
        let token = session.csrf_token();
        if !token.is_empty() {
            req = req.set(XSRF_HEADER, &token);
        }
        if let Some(cookies) = session.cookie_header(&url) {
            req = req.set("Cookie", &cookies);
        }

        let t0 = Instant::now();
        let timeout = self.timeout;
        let call_url = url.clone();
        let result =
            tokio::task::spawn_blocking(move || read_response(req.call(), &call_url, timeout))
                .await
                .map_err(|e| Error::Request {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
        drop(session);

        match result {
            Ok((resp, set_cookies)) => {
                self.session.store_cookies(&url, &set_cookies);
                debug!(
                    %url,
                    status = resp.status,
                    bytes = resp.body.len(),
                    elapsed = ?t0.elapsed(),
                    "fetch"
                );
                Ok(resp)
            }
            Err(e) => {
                info!(%url, error = %e, "error fetching");
                Err(e)
            }
        }
    }

    /// Prime the cookie store with the CSRF cookie.
    ///
    /// `GET /user/me`; the body is discarded.
    pub async fn fetch_csrf_token(&self) -> Result<(), Error> {
        let resp = self.fetch(USER_ME_PATH, &[]).await?;
        if !resp.is_success() {
            return Err(status_error(&resp));
        }
        debug!("CSRF cookie primed");
        Ok(())
    }

    /// GET an endpoint and decode its `{ data: T }` envelope.
    ///
    /// Fetches a CSRF token first if none is known yet.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        if path != USER_ME_PATH && self.session.csrf_token().await.is_empty() {
            self.fetch_csrf_token().await?;
        }

        let resp = self.fetch(path, query).await?;
        parse_envelope(resp)
    }
}

/// Read status, `Set-Cookie` values and body. HTTP error statuses are
/// responses, not errors.
fn read_response(
    result: Result<ureq::Response, ureq::Error>,
    url: &Url,
    timeout: Duration,
) -> Result<(RawResponse, Vec<String>), Error> {
    let resp = match result {
        Ok(resp) | Err(ureq::Error::Status(_, resp)) => resp,
        Err(e) => return Err(transport_error(url, &e, timeout)),
    };
    let status = resp.status();
    let set_cookies = resp
        .all("set-cookie")
        .into_iter()
        .map(String::from)
        .collect();
    let body = resp.into_string().map_err(|e| {
        if is_timeout(&e) {
            Error::Timeout {
                timeout_secs: timeout.as_secs(),
            }
        } else {
            Error::Request {
                url: url.to_string(),
                reason: format!("reading body: {e}"),
            }
        }
    })?;
    Ok((RawResponse { status, body }, set_cookies))
}

/// Map an agent failure onto the crate's error variants.
fn transport_error(url: &Url, err: &ureq::Error, timeout: Duration) -> Error {
    let ureq::Error::Transport(transport) = err else {
        return Error::Request {
            url: url.to_string(),
            reason: err.to_string(),
        };
    };

    let timed_out = std::error::Error::source(transport)
        .and_then(|source| source.downcast_ref::<std::io::Error>())
        .is_some_and(is_timeout);
    if timed_out {
        return Error::Timeout {
            timeout_secs: timeout.as_secs(),
        };
    }

    match transport.kind() {
        ureq::ErrorKind::Dns | ureq::ErrorKind::ConnectionFailed => Error::Connect {
            url: url.to_string(),
            reason: transport.to_string(),
        },
        _ => Error::Request {
            url: url.to_string(),
            reason: transport.to_string(),
        },
    }
}

fn is_timeout(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}

/// Decode the `{ data }` envelope, mapping HTTP failures to errors.
fn parse_envelope<T: DeserializeOwned>(resp: RawResponse) -> Result<T, Error> {
    if !resp.is_success() {
        return Err(status_error(&resp));
    }

    match serde_json::from_str::<Envelope<T>>(&resp.body) {
        Ok(envelope) => Ok(envelope.data),
        Err(e) => Err(Error::Deserialization {
            message: format!("{e} (body preview: {:?})", body_preview(&resp.body)),
            body: resp.body,
        }),
    }
}

/// Turn a non-2xx response into the matching error.
fn status_error(resp: &RawResponse) -> Error {
    if resp.status == 401 || resp.status == 403 {
        return Error::Authentication {
            message: format!("session expired or invalid (HTTP {})", resp.status),
        };
    }

    Error::Api {
        status: resp.status,
        message: body_preview(&resp.body).to_owned(),
    }
}

/// First 200 characters of a response body.
pub(crate) fn body_preview(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map_or(body.len(), |(idx, _)| idx);
    &body[..end]
}
