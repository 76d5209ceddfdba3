//! Client configuration handling.
//!
//! Configuration lives in `client.toml` under the platform config directory
//! (for example `~/.config/gridgate/client.toml` on Linux). Every field is
//! optional; a missing file yields the defaults.
//!
//! ```toml
//! base_url = "https://admin.example.com/api/"
//! renewal_policy = "shared"
//! store = "keyring"
//! key_prefix = "gridgate"
//! log_level = "debug"
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::credentials::CredentialStore;
use crate::pipeline::{DEFAULT_LOGIN_PATH, DEFAULT_REFRESH_PATH, RequestPipeline};
use crate::renewal::RenewalPolicy;
use crate::store::{StoreBackend, StoreError, create_store};

/// Environment variable that overrides `base_url`.
pub const BASE_URL_ENV: &str = "GRIDGATE_BASE_URL";

/// Error type for loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid base_url {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("config directory not available")]
    ConfigDirUnavailable,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root of the admin API. Request paths are resolved against it.
    pub base_url: String,

    pub login_path: String,
    pub refresh_path: String,
    pub renewal_policy: RenewalPolicy,

    /// Credential storage backend.
    pub store: StoreBackend,

    /// Credentials file for the `file` backend; platform default when unset.
    pub store_path: Option<PathBuf>,

    /// Namespace for the stored token keys. Empty keeps the bare keys.
    pub key_prefix: String,

    /// Logging level.
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/".to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            renewal_policy: RenewalPolicy::default(),
            store: StoreBackend::default(),
            store_path: None,
            key_prefix: "gridgate".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Path of `client.toml` in the platform config directory.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        ProjectDirs::from("com", "raibid-labs", "gridgate")
            .map(|dirs| dirs.config_dir().join("client.toml"))
            .ok_or(ConfigError::ConfigDirUnavailable)
    }

    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from_path(Self::default_path()?)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Loaded config from {:?}", path);
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply overrides from a variable lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|url| !url.is_empty()) {
            tracing::debug!("base_url overridden by {}", BASE_URL_ENV);
            self.base_url = url;
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            source,
        })
    }

    /// Open the configured credential backend.
    pub fn open_credentials(&self) -> Result<CredentialStore, ConfigError> {
        let backend = create_store(&self.store, self.store_path.clone())?;
        Ok(CredentialStore::from_boxed(backend).with_prefix(&self.key_prefix))
    }

    /// Build a pipeline over the configured credential backend.
    pub fn build_pipeline(&self) -> Result<RequestPipeline, ConfigError> {
        let pipeline = RequestPipeline::new(self.base_url()?, self.open_credentials()?)
            .with_login_path(self.login_path.clone())
            .with_refresh_path(self.refresh_path.clone())
            .with_renewal_policy(self.renewal_policy);
        Ok(pipeline)
    }
}
