//! Cache backend port.
//!
//! Abstraction over a remote key-value store with TTL-in-seconds semantics.
//! The op set is deliberately small: `GET`/`SET EX`/`DEL`, full key
//! enumeration (pattern deletion is built on top, the backend is not assumed
//! to support native glob deletion), flush, and a liveness ping.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("cache backend failure during {op}: {message}")]
pub struct BackendError {
    pub op: &'static str,
    pub message: String,
}

impl BackendError {
    pub fn new(op: &'static str, err: impl std::fmt::Display) -> Self {
        Self {
            op,
            message: err.to_string(),
        }
    }
}

#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError>;

    /// Store a value that expires after `ttl_secs` seconds.
    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), BackendError>;

    async fn del(&self, key: &str) -> Result<(), BackendError>;

    /// Enumerate every key in the backend catalog.
    async fn keys(&self) -> Result<Vec<String>, BackendError>;

    /// Drop the entire catalog.
    async fn flush(&self) -> Result<(), BackendError>;

    async fn ping(&self) -> Result<(), BackendError>;
}
