//! Durable key/value storage for credentials.
//!
//! This module provides:
//! - [`Secret`] - A wrapper for sensitive values that prevents accidental logging
//! - [`SecretStore`] - Trait for storage backends
//! - [`MemoryStore`] - In-process implementation for tests
//! - [`FileStore`] - JSON file implementation that survives restarts
//! - [`KeyringStore`] - OS keyring implementation (with `keyring-store` feature)
//! - [`create_store`] - Helper to select a backend from configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use gridgate_client::store::{Secret, SecretStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.set("gridgate/access_token", &Secret::new("abc")).await?;
//!
//! let retrieved = store.get("gridgate/access_token").await?;
//! assert_eq!(retrieved.unwrap().expose(), "abc");
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

mod file;
mod memory;
#[cfg(feature = "keyring-store")]
mod keyring;

pub use file::FileStore;
pub use memory::MemoryStore;
#[cfg(feature = "keyring-store")]
pub use keyring::KeyringStore;

/// A secret value that prevents accidental exposure in logs.
///
/// The inner value is only accessible via [`expose()`](Secret::expose).
/// Debug and Display implementations show `[REDACTED]` instead of the value,
/// and the memory is zeroed when the secret is dropped.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    /// Create a new secret from a string value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Expose the secret value.
    ///
    /// Use sparingly and never log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Consume the secret and return the inner value.
    pub fn into_inner(mut self) -> String {
        std::mem::take(&mut self.0)
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Secret {}

/// Error type for secret store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage backend encountered an error.
    #[error("backend error: {message}")]
    BackendError { message: String },

    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The keyring backend is not available.
    #[error("keyring not available: {message}")]
    KeyringUnavailable { message: String },

    /// No platform data directory could be determined.
    #[error("data directory not available")]
    DataDirUnavailable,
}

/// Abstraction over key/value storage backends.
///
/// Implementations include:
/// - [`MemoryStore`] - In-memory storage for testing
/// - [`FileStore`] - JSON file in the platform data directory
/// - [`KeyringStore`] (with `keyring-store` feature) - OS keyring
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Retrieve a secret by key.
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<Secret>, StoreError>;

    /// Store a secret at the given key.
    ///
    /// Overwrites any existing value.
    async fn set(&self, key: &str, secret: &Secret) -> Result<(), StoreError>;

    /// Delete a secret by key.
    ///
    /// Returns `Ok(())` even if the key didn't exist.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Which storage backend to use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process memory only; credentials vanish on exit.
    Memory,

    /// JSON file, at `store_path` or the platform default.
    #[default]
    File,

    /// OS keyring, falling back to the file store when unavailable.
    Keyring,
}

/// Create a secret store for the configured backend.
///
/// # Backend Selection Logic
///
/// - `Memory`: returns a [`MemoryStore`]
/// - `File`: returns a [`FileStore`] at `path`, or the platform default path
/// - `Keyring`: attempts a [`KeyringStore`]; if the keyring is unavailable or
///   the `keyring-store` feature is disabled, falls back to `File` with a warning
pub fn create_store(
    backend: &StoreBackend,
    path: Option<PathBuf>,
) -> Result<Box<dyn SecretStore>, StoreError> {
    match backend {
        StoreBackend::Memory => {
            tracing::debug!("Using in-memory credential storage");
            Ok(Box::new(MemoryStore::new()))
        }
        StoreBackend::File => open_file_store(path),
        StoreBackend::Keyring => {
            #[cfg(feature = "keyring-store")]
            match KeyringStore::try_new("gridgate") {
                Ok(store) => {
                    tracing::info!("Using OS keyring for credential storage");
                    return Ok(Box::new(store));
                }
                Err(e) => {
                    tracing::warn!(
                        "Keyring unavailable ({}), falling back to file store",
                        e
                    );
                }
            }

            #[cfg(not(feature = "keyring-store"))]
            tracing::warn!(
                "Keyring storage requested but keyring-store feature not enabled. \
                 Using file store."
            );

            open_file_store(path)
        }
    }
}

fn open_file_store(path: Option<PathBuf>) -> Result<Box<dyn SecretStore>, StoreError> {
    let path = match path {
        Some(path) => path,
        None => FileStore::default_path()?,
    };
    tracing::debug!("Using file credential storage at {:?}", path);
    Ok(Box::new(FileStore::load_from_path(path)?))
}
