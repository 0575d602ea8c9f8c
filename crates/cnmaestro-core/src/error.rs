// ── Core error types ──
//
// Domain-level errors from cnmaestro-core. The `From<cnmaestro_api::Error>`
// impl translates transport-layer failures into these variants, so callers
// match on what went wrong rather than on HTTP details.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to controller at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Controller request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Unexpected response from controller: {message}")]
    Decode { message: String },

    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Session lifecycle ────────────────────────────────────────────
    /// The periodic session refresh failed more often than allowed.
    #[error("Session refresh failed {failures} times in a row, last error: {last_error}")]
    RefreshExhausted { failures: u32, last_error: String },

    // ── Metrics ──────────────────────────────────────────────────────
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl CoreError {
    /// Whether the controller could not be reached or answered badly.
    ///
    /// Scrapes report these as `up 0`; anything else is a local problem.
    pub fn is_upstream(&self) -> bool {
        !matches!(self, Self::Config { .. } | Self::Metrics(_))
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<cnmaestro_api::Error> for CoreError {
    fn from(err: cnmaestro_api::Error) -> Self {
        match err {
            cnmaestro_api::Error::Authentication { message }
            | cnmaestro_api::Error::Login { message } => {
                CoreError::AuthenticationFailed { message }
            }
            cnmaestro_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            cnmaestro_api::Error::Connect { url, reason } => {
                CoreError::ConnectionFailed { url, reason }
            }
            cnmaestro_api::Error::Request { url, reason } => CoreError::Api {
                message: format!("{url}: {reason}"),
                status: None,
            },
            cnmaestro_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            cnmaestro_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            cnmaestro_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            cnmaestro_api::Error::Api { status, message } => CoreError::Api {
                message: format!("HTTP {status}: {message}"),
                status: Some(status),
            },
            cnmaestro_api::Error::Deserialization { message, .. } => CoreError::Decode { message },
        }
    }
}
