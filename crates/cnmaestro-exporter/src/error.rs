//! Exporter error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and process exit codes.

use std::net::SocketAddr;

use miette::Diagnostic;
use thiserror::Error;

use cnmaestro_config::ConfigError;
use cnmaestro_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum ExporterError {
    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(cnmaestro::config),
        help(
            "Check the config file and CNMAESTRO_* environment variables.\n\
             Run with --print-config to see the effective settings."
        )
    )]
    Config(#[from] ConfigError),

    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to controller at {url}: {reason}")]
    #[diagnostic(
        code(cnmaestro::connection_failed),
        help("Check that `instance` points at your cnMaestro cloud region.")
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out after {seconds}s")]
    #[diagnostic(code(cnmaestro::timeout))]
    Timeout { seconds: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Login failed: {message}")]
    #[diagnostic(
        code(cnmaestro::auth_failed),
        help(
            "Verify username and password, or copy a fresh `sid` cookie from a \
             logged-in browser into session_id."
        )
    )]
    AuthFailed { message: String },

    #[error("Session refresh failed {failures} times in a row: {last_error}")]
    #[diagnostic(
        code(cnmaestro::refresh_exhausted),
        help("The controller session could not be renewed. Check the credentials and restart.")
    )]
    RefreshExhausted { failures: u32, last_error: String },

    #[error("Session refresh task stopped unexpectedly")]
    #[diagnostic(code(cnmaestro::refresh_stopped))]
    RefreshStopped,

    // ── Server ───────────────────────────────────────────────────────
    #[error("Cannot listen on {addr}")]
    #[diagnostic(
        code(cnmaestro::bind),
        help("Pick another address with --listen-address.")
    )]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    // ── Anything else from the core ──────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(cnmaestro::core))]
    Core(CoreError),
}

impl ExporterError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => exit_code::USAGE,
            Self::AuthFailed { .. } | Self::RefreshExhausted { .. } => exit_code::AUTH,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → ExporterError mapping ────────────────────────────────

impl From<CoreError> for ExporterError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::Timeout { timeout_secs } => Self::Timeout {
                seconds: timeout_secs,
            },
            CoreError::RefreshExhausted {
                failures,
                last_error,
            } => Self::RefreshExhausted {
                failures,
                last_error,
            },
            other => Self::Core(other),
        }
    }
}
