//! Artifact storage.
//!
//! Artifacts are write-once, read-once values with a short expiry. The
//! store must provide per-key last-writer-wins semantics; no
//! read-modify-write is required. A shared cache (Redis or similar) is the
//! usual production backend, with [`InMemoryArtifactStore`] covering tests
//! and single-process deployments.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::SamlResult;

/// Key-value storage with per-entry expiry.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Stores a value, replacing any existing entry for the key.
    ///
    /// `expires_at` is a unix timestamp in seconds; the entry is gone after
    /// that instant.
    async fn set(&self, namespace: &str, key: &str, value: &str, expires_at: u64)
        -> SamlResult<()>;

    /// Fetches a value, or `None` if the key is absent or expired.
    async fn get(&self, namespace: &str, key: &str) -> SamlResult<Option<String>>;

    /// Removes a value. Removing an absent key is not an error.
    async fn delete(&self, namespace: &str, key: &str) -> SamlResult<()>;
}

/// In-process artifact store backed by a mutex-guarded map.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    entries: Mutex<HashMap<(String, String), (String, u64)>>,
}

impl InMemoryArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn set(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
        expires_at: u64,
    ) -> SamlResult<()> {
        self.entries.lock().insert(
            (namespace.to_string(), key.to_string()),
            (value.to_string(), expires_at),
        );
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> SamlResult<Option<String>> {
        let mut entries = self.entries.lock();
        let map_key = (namespace.to_string(), key.to_string());
        match entries.get(&map_key) {
            Some((_, expires_at)) if *expires_at <= unix_now() => {
                entries.remove(&map_key);
                Ok(None)
            }
            Some((value, _)) => Ok(Some(value.clone())),
            None => Ok(None),
        }
    }

    async fn delete(&self, namespace: &str, key: &str) -> SamlResult<()> {
        self.entries
            .lock()
            .remove(&(namespace.to_string(), key.to_string()));
        Ok(())
    }
}

/// Current unix time in seconds.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_and_get_roundtrip() {
        let store = InMemoryArtifactStore::new();
        store
            .set("artifact", "abc", "<xml/>", unix_now() + 900)
            .await
            .unwrap();

        assert_eq!(
            store.get("artifact", "abc").await.unwrap().as_deref(),
            Some("<xml/>")
        );
    }

    #[tokio::test]
    async fn expired_entries_are_gone() {
        let store = InMemoryArtifactStore::new();
        store
            .set("artifact", "abc", "<xml/>", unix_now().saturating_sub(1))
            .await
            .unwrap();

        assert_eq!(store.get("artifact", "abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn last_writer_wins() {
        let store = InMemoryArtifactStore::new();
        let expires = unix_now() + 900;
        store.set("artifact", "abc", "first", expires).await.unwrap();
        store.set("artifact", "abc", "second", expires).await.unwrap();

        assert_eq!(
            store.get("artifact", "abc").await.unwrap().as_deref(),
            Some("second")
        );
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let store = InMemoryArtifactStore::new();
        let expires = unix_now() + 900;
        store.set("artifact", "abc", "value", expires).await.unwrap();

        assert_eq!(store.get("other", "abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryArtifactStore::new();
        store.delete("artifact", "missing").await.unwrap();
    }
}
