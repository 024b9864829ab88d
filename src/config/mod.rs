//! Configuration layer: typed settings with layered precedence (file → env).

use std::{path::Path, str::FromStr};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "corso";
const ENV_PREFIX: &str = "CORSO";

const DEFAULT_REDIS_HOST: &str = "127.0.0.1";
const DEFAULT_REDIS_PORT: u16 = 6379;
const DEFAULT_REDIS_DB_INDEX: u8 = 0;

const DEFAULT_COURSE_TTL_SECS: u64 = 3600;
const DEFAULT_MODULE_TTL_SECS: u64 = 1800;
const DEFAULT_LESSON_TTL_SECS: u64 = 1800;
const DEFAULT_ENROLLMENT_TTL_SECS: u64 = 1800;
const DEFAULT_LIST_TTL_SECS: u64 = 600;
const DEFAULT_TRACKED_VIEW_TTL_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read configuration: {0}")]
    Read(#[from] config::ConfigError),
    #[error("invalid `{field}`: {message}")]
    Invalid { field: &'static str, message: String },
}

impl LoadError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub redis: RedisSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub course_ttl_secs: u64,
    pub module_ttl_secs: u64,
    pub lesson_ttl_secs: u64,
    pub enrollment_ttl_secs: u64,
    pub list_ttl_secs: u64,
    pub tracked_view_ttl_secs: u64,
}

#[derive(Debug, Clone)]
pub struct RedisSettings {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub db_index: u8,
}

impl RedisSettings {
    /// Connection URL for the redis client. The credential stays out of
    /// logs; never `Display` this value.
    pub fn url(&self) -> String {
        let auth = self
            .password
            .as_deref()
            .map(|password| format!(":{password}@"))
            .unwrap_or_default();
        format!(
            "redis://{auth}{host}:{port}/{db}",
            host = self.host,
            port = self.port,
            db = self.db_index
        )
    }
}

/// Load settings from the default file, an optional local `corso` file, an
/// optional explicit file, and `CORSO__*` environment variables, in that
/// precedence order.
pub fn load(config_file: Option<&Path>) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = config_file {
        builder = builder.add_source(File::from(path).required(true));
    }

    let raw: RawSettings = builder
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?
        .try_deserialize()?;

    Settings::from_raw(raw)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    redis: RawRedisSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    course_ttl_secs: Option<u64>,
    module_ttl_secs: Option<u64>,
    lesson_ttl_secs: Option<u64>,
    enrollment_ttl_secs: Option<u64>,
    list_ttl_secs: Option<u64>,
    tracked_view_ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRedisSettings {
    host: Option<String>,
    port: Option<u16>,
    password: Option<String>,
    db_index: Option<u8>,
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        Ok(Self {
            logging: build_logging_settings(raw.logging)?,
            cache: build_cache_settings(raw.cache)?,
            redis: build_redis_settings(raw.redis)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let settings = CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        course_ttl_secs: cache.course_ttl_secs.unwrap_or(DEFAULT_COURSE_TTL_SECS),
        module_ttl_secs: cache.module_ttl_secs.unwrap_or(DEFAULT_MODULE_TTL_SECS),
        lesson_ttl_secs: cache.lesson_ttl_secs.unwrap_or(DEFAULT_LESSON_TTL_SECS),
        enrollment_ttl_secs: cache
            .enrollment_ttl_secs
            .unwrap_or(DEFAULT_ENROLLMENT_TTL_SECS),
        list_ttl_secs: cache.list_ttl_secs.unwrap_or(DEFAULT_LIST_TTL_SECS),
        tracked_view_ttl_secs: cache
            .tracked_view_ttl_secs
            .unwrap_or(DEFAULT_TRACKED_VIEW_TTL_SECS),
    };

    for (field, value) in [
        ("cache.course_ttl_secs", settings.course_ttl_secs),
        ("cache.module_ttl_secs", settings.module_ttl_secs),
        ("cache.lesson_ttl_secs", settings.lesson_ttl_secs),
        ("cache.enrollment_ttl_secs", settings.enrollment_ttl_secs),
        ("cache.list_ttl_secs", settings.list_ttl_secs),
        ("cache.tracked_view_ttl_secs", settings.tracked_view_ttl_secs),
    ] {
        if value == 0 {
            return Err(LoadError::invalid(field, "must be greater than zero"));
        }
    }

    Ok(settings)
}

fn build_redis_settings(redis: RawRedisSettings) -> Result<RedisSettings, LoadError> {
    let host = redis
        .host
        .unwrap_or_else(|| DEFAULT_REDIS_HOST.to_string());
    if host.trim().is_empty() {
        return Err(LoadError::invalid("redis.host", "must not be empty"));
    }

    let port = redis.port.unwrap_or(DEFAULT_REDIS_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "redis.port",
            "port must be greater than zero",
        ));
    }

    let password = redis.password.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    Ok(RedisSettings {
        host,
        port,
        password,
        db_index: redis.db_index.unwrap_or(DEFAULT_REDIS_DB_INDEX),
    })
}
