use thiserror::Error;

/// Top-level error type for the `cnmaestro-api` crate.
///
/// Covers every failure mode of talking to the controller: login,
/// transport, HTTP status, and response decoding.
/// `cnmaestro-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The controller rejected the session (HTTP 401/403).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The login provider could not produce a session.
    #[error("Login failed: {message}")]
    Login { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error of the login client.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The controller could not be reached (DNS, refused connection, TLS).
    #[error("Cannot connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    /// An API request failed after the connection was made.
    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-2xx response from the controller.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}
