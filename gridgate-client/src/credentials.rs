//! The credential store: access and refresh tokens under two keys.
//!
//! [`CredentialStore`] is a thin layer over a [`SecretStore`] backend. Each
//! operation is a single read, write, or delete with no other side effects;
//! the two keys are independent, so one may exist without the other.

use std::fmt;
use std::sync::Arc;

use crate::store::{Secret, SecretStore, StoreError};
use crate::token::TokenPair;

/// Key of the access token when no prefix is configured.
pub const ACCESS_KEY: &str = "access_token";

/// Key of the refresh token when no prefix is configured.
pub const REFRESH_KEY: &str = "refresh_token";

/// Access/refresh token persistence over a pluggable backend.
///
/// Cheap to clone; clones share the same backend.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn SecretStore>,
    access_key: String,
    refresh_key: String,
}

impl CredentialStore {
    /// Create a credential store using the unprefixed keys.
    pub fn new(backend: impl SecretStore + 'static) -> Self {
        Self::from_arc(Arc::new(backend))
    }

    /// Create a credential store over a boxed backend, as returned by
    /// [`create_store`](crate::store::create_store).
    pub fn from_boxed(backend: Box<dyn SecretStore>) -> Self {
        Self::from_arc(Arc::from(backend))
    }

    pub fn from_arc(backend: Arc<dyn SecretStore>) -> Self {
        Self {
            backend,
            access_key: ACCESS_KEY.to_string(),
            refresh_key: REFRESH_KEY.to_string(),
        }
    }

    /// Namespace both keys as `{prefix}/access_token` and `{prefix}/refresh_token`.
    ///
    /// An empty prefix keeps the bare keys.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        if !prefix.is_empty() {
            self.access_key = format!("{}/{}", prefix, ACCESS_KEY);
            self.refresh_key = format!("{}/{}", prefix, REFRESH_KEY);
        }
        self
    }

    pub fn backend(&self) -> &Arc<dyn SecretStore> {
        &self.backend
    }

    pub async fn set_access(&self, token: &str) -> Result<(), StoreError> {
        self.backend.set(&self.access_key, &Secret::new(token)).await
    }

    pub async fn load_access(&self) -> Result<Option<Secret>, StoreError> {
        self.backend.get(&self.access_key).await
    }

    pub async fn remove_access(&self) -> Result<(), StoreError> {
        self.backend.delete(&self.access_key).await
    }

    pub async fn set_refresh(&self, token: &str) -> Result<(), StoreError> {
        self.backend.set(&self.refresh_key, &Secret::new(token)).await
    }

    pub async fn load_refresh(&self) -> Result<Option<Secret>, StoreError> {
        self.backend.get(&self.refresh_key).await
    }

    pub async fn remove_refresh(&self) -> Result<(), StoreError> {
        self.backend.delete(&self.refresh_key).await
    }

    /// Store a token pair.
    ///
    /// A pair without a refresh token leaves the stored refresh token as is.
    pub async fn store_pair(&self, pair: &TokenPair) -> Result<(), StoreError> {
        self.set_access(pair.access.expose()).await?;
        if let Some(refresh) = &pair.refresh {
            self.set_refresh(refresh.expose()).await?;
        }
        Ok(())
    }

    /// Load both tokens. Returns `None` when no access token is stored.
    pub async fn load_pair(&self) -> Result<Option<TokenPair>, StoreError> {
        let Some(access) = self.load_access().await? else {
            return Ok(None);
        };
        Ok(Some(TokenPair {
            access,
            refresh: self.load_refresh().await?,
        }))
    }

    /// Remove both tokens.
    ///
    /// Both deletes are attempted; the first error is returned.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let access = self.remove_access().await;
        let refresh = self.remove_refresh().await;
        access.and(refresh)
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("access_key", &self.access_key)
            .field("refresh_key", &self.refresh_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = CredentialStore::new(MemoryStore::new());

        store.set_refresh("r1").await.unwrap();
        assert!(store.load_access().await.unwrap().is_none());
        assert_eq!(store.load_refresh().await.unwrap().unwrap().expose(), "r1");

        store.set_access("a1").await.unwrap();
        store.remove_refresh().await.unwrap();
        assert_eq!(store.load_access().await.unwrap().unwrap().expose(), "a1");
        assert!(store.load_refresh().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_pair_keeps_refresh_when_absent() {
        let store = CredentialStore::new(MemoryStore::new());
        store.store_pair(&TokenPair::new("a1", "r1")).await.unwrap();
        store.store_pair(&TokenPair::access_only("a2")).await.unwrap();

        let pair = store.load_pair().await.unwrap().unwrap();
        assert_eq!(pair, TokenPair::new("a2", "r1"));
    }

    #[tokio::test]
    async fn test_clear_removes_both() {
        let store = CredentialStore::new(MemoryStore::new());
        store.store_pair(&TokenPair::new("a1", "r1")).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.load_pair().await.unwrap().is_none());
        assert!(store.load_refresh().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prefixed_keys() {
        let backend = Arc::new(MemoryStore::new());
        let store = CredentialStore::from_arc(backend.clone()).with_prefix("gridgate/");
        store.set_access("a1").await.unwrap();

        assert_eq!(backend.get("gridgate/access_token").await.unwrap().unwrap().expose(), "a1");
        assert!(backend.get("access_token").await.unwrap().is_none());
    }
}
