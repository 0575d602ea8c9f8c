//! Business logic between `cnmaestro-api` and the exporter binary.
//!
//! - **[`Controller`]** wires a shared session into the API client and the
//!   [`SessionManager`], and hands out the [`MetricsCollector`].
//! - **[`SessionManager`]** performs the initial login and the periodic
//!   refresh, escalating to a fatal signal after too many failures.
//! - **[`MetricsCollector`]** fetches controller data per scrape and turns
//!   it into Prometheus metric families.
//! - **Domain model** ([`model`]) with the normalizing conversions in
//!   [`convert`].

pub mod collector;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod metrics;
pub mod model;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use collector::MetricsCollector;
pub use config::{AuthCredentials, ControllerConfig, RefreshPolicy, TlsVerification};
pub use controller::Controller;
pub use error::CoreError;
pub use metrics::{TEXT_CONTENT_TYPE, encode_text};
pub use session::{RefreshTask, SessionManager, SessionState};

pub use model::{
    ApGroupSummary, Availability, Band, Device, FleetSnapshot, PortalSessionAggregate, Radio,
    RebootEvent,
};
