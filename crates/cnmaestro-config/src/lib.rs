//! Configuration for the cnMaestro exporter.
//!
//! TOML file + `CNMAESTRO_*` environment overrides, credential resolution,
//! and translation to `cnmaestro_core::ControllerConfig`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cnmaestro_core::{AuthCredentials, ControllerConfig, RefreshPolicy, TlsVerification};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "CNMAESTRO_";

/// Keys that may be set from the environment.
const ENV_KEYS: &[&str] = &["instance", "username", "password", "session_id", "xsrf_token"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured: set session_id, or username and password")]
    NoCredentials,

    #[error("config file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Controller base URL (e.g. "https://eu-west.cloud.cambiumnetworks.com").
    pub instance: Option<String>,

    /// Login name for the form login.
    pub username: Option<String>,

    /// Password for the form login (prefer `CNMAESTRO_PASSWORD`).
    pub password: Option<String>,

    /// Pre-established session cookie; replaces username/password.
    pub session_id: Option<String>,

    /// CSRF token belonging to `session_id`.
    pub xsrf_token: Option<String>,

    /// AP groups listed on the index page. Empty = ask the controller.
    #[serde(default)]
    pub ap_groups: Vec<String>,

    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub exporter: ExporterSettings,

    #[serde(default)]
    pub session: SessionSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            instance: None,
            username: None,
            password: None,
            session_id: None,
            xsrf_token: None,
            ap_groups: Vec::new(),
            insecure: false,
            ca_cert: None,
            request_timeout_secs: default_request_timeout(),
            exporter: ExporterSettings::default(),
            session: SessionSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterSettings {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Scrape deadline when Prometheus does not send one.
    #[serde(default = "default_scrape_timeout")]
    pub scrape_timeout_secs: u64,
}

impl Default for ExporterSettings {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            scrape_timeout_secs: default_scrape_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSettings {
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,

    #[serde(default = "default_max_refresh_failures")]
    pub max_refresh_failures: u32,

    #[serde(default = "default_login_timeout")]
    pub login_timeout_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
            retry_interval_secs: default_retry_interval(),
            max_refresh_failures: default_max_refresh_failures(),
            login_timeout_secs: default_login_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}
fn default_listen_address() -> String {
    "0.0.0.0:9836".into()
}
fn default_scrape_timeout() -> u64 {
    10
}
fn default_refresh_interval() -> u64 {
    6 * 60 * 60
}
fn default_retry_interval() -> u64 {
    30 * 60
}
fn default_max_refresh_failures() -> u32 {
    24
}
fn default_login_timeout() -> u64 {
    20
}

// ── Config file path ────────────────────────────────────────────────

/// `./config.toml` if it exists, otherwise the platform config directory.
pub fn config_path() -> PathBuf {
    let local = PathBuf::from("config.toml");
    if local.is_file() {
        return local;
    }
    ProjectDirs::from("com", "cnmaestro", "cnmaestro-exporter")
        .map_or(local, |dirs| dirs.config_dir().join("config.toml"))
}

// ── Config loading ──────────────────────────────────────────────────

/// Defaults, then the TOML file at `path`, then the environment.
///
/// A missing file contributes nothing.
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).only(ENV_KEYS))
}

/// Load and validate the config at `path`.
///
/// `required` turns a missing file into an error.
pub fn load_config(path: &Path, required: bool) -> Result<Config, ConfigError> {
    if required && !path.is_file() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    load_from(&figment(path))
}

/// Extract and validate a config from an arbitrary figment.
pub fn load_from(figment: &Figment) -> Result<Config, ConfigError> {
    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

// ── Validation & translation ────────────────────────────────────────

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        self.instance_url()?;
        self.listen_address()?;
        for (field, value) in [
            ("exporter.scrape_timeout_secs", self.exporter.scrape_timeout_secs),
            ("session.refresh_interval_secs", self.session.refresh_interval_secs),
            ("session.retry_interval_secs", self.session.retry_interval_secs),
            ("session.login_timeout_secs", self.session.login_timeout_secs),
            ("request_timeout_secs", self.request_timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation {
                    field: field.into(),
                    reason: "must be greater than zero".into(),
                });
            }
        }
        Ok(())
    }

    /// The controller base URL.
    pub fn instance_url(&self) -> Result<url::Url, ConfigError> {
        let raw = self
            .instance
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::Validation {
                field: "instance".into(),
                reason: "required".into(),
            })?;
        let url: url::Url = raw.parse().map_err(|e| ConfigError::Validation {
            field: "instance".into(),
            reason: format!("invalid URL {raw:?}: {e}"),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "instance".into(),
                reason: format!("unsupported scheme {:?}", url.scheme()),
            });
        }
        Ok(url)
    }

    pub fn listen_address(&self) -> Result<SocketAddr, ConfigError> {
        self.exporter
            .listen_address
            .parse()
            .map_err(|e| ConfigError::Validation {
                field: "exporter.listen_address".into(),
                reason: format!("{e}"),
            })
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.exporter.scrape_timeout_secs)
    }

    /// A pre-established session wins over username/password.
    pub fn resolve_auth(&self) -> Result<AuthCredentials, ConfigError> {
        if let Some(session_id) = self.session_id.as_ref().filter(|s| !s.is_empty()) {
            return Ok(AuthCredentials::SessionId {
                session_id: SecretString::from(session_id.clone()),
                xsrf_token: self.xsrf_token.clone().filter(|t| !t.is_empty()),
            });
        }
        match (&self.username, &self.password) {
            (Some(username), Some(password)) if !username.is_empty() => {
                Ok(AuthCredentials::Credentials {
                    username: username.clone(),
                    password: SecretString::from(password.clone()),
                })
            }
            _ => Err(ConfigError::NoCredentials),
        }
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            interval: Duration::from_secs(self.session.refresh_interval_secs),
            retry_interval: Duration::from_secs(self.session.retry_interval_secs),
            max_failures: self.session.max_refresh_failures,
            login_timeout: Duration::from_secs(self.session.login_timeout_secs),
        }
    }

    pub fn to_controller_config(&self) -> Result<ControllerConfig, ConfigError> {
        let url = self.instance_url()?;
        let auth = self.resolve_auth()?;

        let tls = if self.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        Ok(ControllerConfig {
            url,
            auth,
            tls,
            timeout: Duration::from_secs(self.request_timeout_secs),
            ap_groups: self.ap_groups.clone(),
            refresh: self.refresh_policy(),
        })
    }

    /// The effective config as TOML, with secrets masked.
    pub fn to_redacted_toml(&self) -> Result<String, ConfigError> {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "********".to_string());
        let redacted = Self {
            password: mask(&self.password),
            session_id: mask(&self.session_id),
            xsrf_token: mask(&self.xsrf_token),
            ..self.clone()
        };
        Ok(toml::to_string_pretty(&redacted)?)
    }
}
