//! # Gridgate Client
//!
//! Authenticated access to the admin API.
//!
//! This crate provides:
//! - [`CredentialStore`] - Access and refresh tokens over a pluggable [`SecretStore`]
//! - [`RequestPipeline`] - Bearer-token requests with one-shot renewal on 401
//! - [`RenewalCoordinator`] - Single-flight renewal across concurrent calls
//! - [`ClientConfig`] - TOML configuration and pipeline construction
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gridgate_client::{ClientConfig, PipelineError};
//!
//! async fn list_projects() -> Result<serde_json::Value, Box<dyn std::error::Error>> {
//!     let pipeline = ClientConfig::load()?.build_pipeline()?;
//!     match pipeline.get_json("projects/").await {
//!         Err(e) if e.is_auth_expired() => Err("please sign in again".into()),
//!         other => Ok(other?),
//!     }
//! }
//! ```

pub mod config;
pub mod credentials;
pub mod error;
pub mod pipeline;
pub mod renewal;
pub mod store;
pub mod token;

// Re-export commonly used types at crate root
pub use config::{
    ClientConfig,
    ConfigError,
};

pub use credentials::CredentialStore;

pub use error::{
    ErrorCategory,
    PipelineError,
};

pub use pipeline::{
    ApiRequest,
    CallLifecycle,
    CallState,
    RequestPipeline,
};

pub use renewal::{
    RenewalCoordinator,
    RenewalOutcome,
    RenewalPolicy,
};

pub use store::{
    FileStore,
    MemoryStore,
    Secret,
    SecretStore,
    StoreBackend,
    StoreError,
    create_store,
};

#[cfg(feature = "keyring-store")]
pub use store::KeyringStore;

pub use token::{
    TokenEnvelope,
    TokenPair,
};
