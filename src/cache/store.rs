//! Cache port over a remote backend.
//!
//! `CacheStore` is the only surface the rest of the engine talks to. Its
//! contract: when the global enable flag is off or the backend connection is
//! marked unhealthy, every operation is a no-op returning a miss/void, and no
//! backend call is attempted. Backend failures are swallowed here (logged,
//! counted, and converted into misses) so callers transparently fall through
//! to the authoritative store and never branch on cache availability.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::backend::{BackendError, CacheBackend};
use super::config::CacheConfig;
use super::keys::WILDCARD;

const SOURCE: &str = "cache::store";

const HEALTH_SENTINEL_KEY: &str = "corso:health:sentinel";
const HEALTH_SENTINEL_VALUE: &str = "ok";
const HEALTH_SENTINEL_TTL_SECS: u64 = 10;

pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    config: CacheConfig,
    /// Instance-owned health state. Set false on any operational failure;
    /// only a successful `health_check` round trip flips it back.
    healthy: AtomicBool,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        Self {
            backend,
            config,
            healthy: AtomicBool::new(true),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    fn active(&self) -> bool {
        self.config.enabled && self.is_healthy()
    }

    fn mark_unhealthy(&self, op: &'static str, key: &str, err: &BackendError) {
        self.healthy.store(false, Ordering::Relaxed);
        counter!("corso_cache_error_total").increment(1);
        warn!(
            op,
            key,
            target_module = SOURCE,
            error = %err,
            "Cache backend failure, marking connection unhealthy"
        );
    }

    /// Fetch and deserialize a cached value. Any failure (disabled store,
    /// unhealthy backend, absent key, undecodable payload) is a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.active() {
            return None;
        }

        match self.backend.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    counter!("corso_cache_hit_total").increment(1);
                    Some(value)
                }
                Err(err) => {
                    // Undecodable entries are evicted so they cannot keep
                    // masking the authoritative value.
                    warn!(
                        key,
                        target_module = SOURCE,
                        error = %err,
                        "Dropping undecodable cache entry"
                    );
                    let _ = self.backend.del(key).await;
                    counter!("corso_cache_miss_total").increment(1);
                    None
                }
            },
            Ok(None) => {
                counter!("corso_cache_miss_total").increment(1);
                None
            }
            Err(err) => {
                self.mark_unhealthy("get", key, &err);
                None
            }
        }
    }

    /// Serialize and store a value with the given TTL.
    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        if !self.active() {
            return;
        }

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    key,
                    target_module = SOURCE,
                    error = %err,
                    "Skipped caching unserializable value"
                );
                return;
            }
        };

        if let Err(err) = self.backend.set(key, &raw, ttl_secs).await {
            self.mark_unhealthy("set", key, &err);
        }
    }

    pub async fn delete(&self, key: &str) {
        if !self.active() {
            return;
        }

        if let Err(err) = self.backend.del(key).await {
            self.mark_unhealthy("del", key, &err);
        }
    }

    /// Purge every key matching a pattern.
    ///
    /// The backend offers no native glob deletion, so this enumerates the
    /// full catalog, strips the trailing wildcard from the pattern, and
    /// deletes every key containing the remainder. O(total key count) per
    /// call, bounded by the backend catalog size; an explicit, accepted
    /// cost. Returns the number of keys purged.
    pub async fn delete_by_pattern(&self, pattern: &str) -> u64 {
        if !self.active() {
            return 0;
        }

        let needle = pattern.trim_end_matches(WILDCARD);
        let keys = match self.backend.keys().await {
            Ok(keys) => keys,
            Err(err) => {
                self.mark_unhealthy("keys", pattern, &err);
                return 0;
            }
        };

        let mut purged = 0u64;
        for key in keys.iter().filter(|key| key.contains(needle)) {
            match self.backend.del(key).await {
                Ok(()) => purged += 1,
                Err(err) => {
                    self.mark_unhealthy("del_by_pattern", key, &err);
                    break;
                }
            }
        }

        counter!("corso_cache_purge_total").increment(purged);
        debug!(
            pattern,
            purged,
            target_module = SOURCE,
            "Purged keys by pattern"
        );
        purged
    }

    /// Drop everything in the backend catalog.
    pub async fn clear(&self) {
        if !self.active() {
            return;
        }

        if let Err(err) = self.backend.flush().await {
            self.mark_unhealthy("flush", "*", &err);
        }
    }

    /// Set/get/delete a sentinel key against the backend.
    ///
    /// This is the engine's only diagnostic surface: a successful round trip
    /// flips the health flag back to healthy (there is no automatic retry
    /// inside requests), a failed one leaves the store degraded. With the
    /// cache disabled, no backend call is attempted and the probe reports
    /// false.
    pub async fn health_check(&self) -> bool {
        if !self.config.enabled {
            debug!(
                target_module = SOURCE,
                "Health check skipped: cache disabled"
            );
            return false;
        }

        let round_trip = async {
            self.backend
                .set(
                    HEALTH_SENTINEL_KEY,
                    HEALTH_SENTINEL_VALUE,
                    HEALTH_SENTINEL_TTL_SECS,
                )
                .await?;
            let echoed = self.backend.get(HEALTH_SENTINEL_KEY).await?;
            self.backend.del(HEALTH_SENTINEL_KEY).await?;
            Ok::<_, BackendError>(echoed)
        }
        .await;

        match round_trip {
            Ok(Some(value)) if value == HEALTH_SENTINEL_VALUE => {
                self.healthy.store(true, Ordering::Relaxed);
                true
            }
            Ok(echoed) => {
                self.healthy.store(false, Ordering::Relaxed);
                warn!(
                    target_module = SOURCE,
                    echoed = ?echoed,
                    "Health sentinel came back wrong"
                );
                false
            }
            Err(err) => {
                self.mark_unhealthy("health_check", HEALTH_SENTINEL_KEY, &err);
                false
            }
        }
    }
}
