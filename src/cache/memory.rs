//! In-process cache backend.
//!
//! Backs tests and single-node deployments where a network cache is not
//! worth operating. Entries carry an absolute expiry instant; a TTL of zero
//! expires immediately, which is also how tests simulate expiry without a
//! clock.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::backend::{BackendError, CacheBackend};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::memory";

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        rw_read(&self.entries, SOURCE, "len")
            .values()
            .filter(|entry| !entry.is_expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(key) {
            Some(entry) if entry.is_expired(Instant::now()) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), BackendError> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now() + Duration::from_secs(ttl_secs),
        };
        rw_write(&self.entries, SOURCE, "set").insert(key.to_string(), entry);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), BackendError> {
        rw_write(&self.entries, SOURCE, "del").remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, BackendError> {
        let now = Instant::now();
        let entries = rw_read(&self.entries, SOURCE, "keys");
        Ok(entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn flush(&self) -> Result<(), BackendError> {
        rw_write(&self.entries, SOURCE, "flush").clear();
        Ok(())
    }

    async fn ping(&self) -> Result<(), BackendError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let backend = MemoryBackend::new();

        backend.set("k", "v", 60).await.expect("set");
        assert_eq!(backend.get("k").await.expect("get"), Some("v".to_string()));
    }

    #[tokio::test]
    async fn zero_ttl_expires_immediately() {
        let backend = MemoryBackend::new();

        backend.set("k", "v", 0).await.expect("set");
        assert_eq!(backend.get("k").await.expect("get"), None);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let backend = MemoryBackend::new();

        backend.set("k", "v", 60).await.expect("set");
        backend.del("k").await.expect("first del");
        backend.del("k").await.expect("second del");
        assert_eq!(backend.get("k").await.expect("get"), None);
    }

    #[tokio::test]
    async fn keys_lists_only_live_entries() {
        let backend = MemoryBackend::new();

        backend.set("live", "v", 60).await.expect("set");
        backend.set("dead", "v", 0).await.expect("set");

        let keys = backend.keys().await.expect("keys");
        assert_eq!(keys, vec!["live".to_string()]);
    }

    #[tokio::test]
    async fn flush_empties_the_catalog() {
        let backend = MemoryBackend::new();

        backend.set("a", "1", 60).await.expect("set");
        backend.set("b", "2", 60).await.expect("set");
        backend.flush().await.expect("flush");

        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn overwrite_replaces_value_and_ttl() {
        let backend = MemoryBackend::new();

        backend.set("k", "old", 0).await.expect("set");
        backend.set("k", "new", 60).await.expect("set");
        assert_eq!(
            backend.get("k").await.expect("get"),
            Some("new".to_string())
        );
    }
}
