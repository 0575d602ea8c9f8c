// cnmaestro-api: Async Rust client for the cnMaestro cloud controller API

pub mod auth;
pub mod client;
pub mod devices;
pub mod error;
pub mod guest;
pub mod models;
pub mod pagination;
pub mod profiles;
pub mod session;
pub mod transport;

pub use auth::{AuthInfo, FormLoginProvider, LoginProvider, StaticSessionProvider};
pub use client::{ApiClient, RawResponse};
pub use error::Error;
pub use session::Session;
pub use transport::{TlsMode, TransportConfig};
