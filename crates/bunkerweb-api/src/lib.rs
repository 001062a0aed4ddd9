// bunkerweb-api: Async Rust client for the BunkerWeb control-plane API

pub mod actions;
pub mod auth;
pub mod batch;
pub mod client;
mod endpoints;
mod envelope;
pub mod error;
pub mod keys;
pub mod models;
pub mod multipart;
pub mod transport;

pub use actions::{ActionOutcome, InstanceAction};
pub use auth::{AuthScheme, Credentials};
pub use batch::Batch;
pub use client::BunkerWebClient;
pub use error::{Error, IdempotentDelete, NotFoundExt};
pub use keys::{BanKey, BanScope, ConfigKey, ConfigScope, service_identifier};
pub use multipart::{ConfigUpload, ConfigUploadUpdate, PluginUpload, UploadFile};
pub use transport::{TlsMode, TransportConfig};
