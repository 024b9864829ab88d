//! Redis adapter for the cache backend port.
//!
//! Thin mapping from the port's op set onto `GET`/`SET EX`/`DEL`/`KEYS`/
//! `FLUSHDB`/`PING`. The `ConnectionManager` reconnects on its own; error
//! classification and health bookkeeping live in the cache store, not here.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::cache::{BackendError, CacheBackend};
use crate::config::RedisSettings;

use super::error::InfraError;

pub struct RedisBackend {
    connection: ConnectionManager,
}

impl RedisBackend {
    /// Connect using environment-supplied settings. Connection parameters
    /// are configuration, never derived at runtime.
    pub async fn connect(settings: &RedisSettings) -> Result<Self, InfraError> {
        let client = redis::Client::open(settings.url()).map_err(|err| {
            InfraError::cache_backend(format!("invalid redis connection parameters: {err}"))
        })?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|err| InfraError::cache_backend(format!("redis connect failed: {err}")))?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, BackendError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|err| BackendError::new("get", err))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), BackendError> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .set_ex(key, value, ttl_secs)
            .await
            .map_err(|err| BackendError::new("set", err))?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), BackendError> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .del(key)
            .await
            .map_err(|err| BackendError::new("del", err))?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, BackendError> {
        let mut conn = self.connection.clone();
        let keys: Vec<String> = conn
            .keys("*")
            .await
            .map_err(|err| BackendError::new("keys", err))?;
        Ok(keys)
    }

    async fn flush(&self) -> Result<(), BackendError> {
        let mut conn = self.connection.clone();
        let _: () = redis::cmd("FLUSHDB")
            .query_async(&mut conn)
            .await
            .map_err(|err| BackendError::new("flush", err))?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|err| BackendError::new("ping", err))?;
        Ok(())
    }
}
