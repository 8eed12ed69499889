//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroU32, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

mod cli;

pub use cli::{CliArgs, Command, KeyArgs, ListingArgs, QuestionArgs, RuntimeOverrides, ShowArgs};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "exambank";
const ENV_PREFIX: &str = "EXAMBANK";
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";
const DEFAULT_REDIS_POOL_MAX_SIZE: u64 = 16;
const DEFAULT_REDIS_CONNECT_TIMEOUT_MS: u64 = 500;
const DEFAULT_LISTING_TTL_SECS: u64 = 20 * 60;
const DEFAULT_LOCK_TTL_SECS: u64 = 3;
const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 250;
const DEFAULT_MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub redis: RedisSettings,
    pub cache: CacheSettings,
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
pub struct RedisSettings {
    pub url: String,
    pub pool_max_size: usize,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub listing_ttl: Duration,
    pub lock_ttl: Duration,
    pub operation_timeout: Duration,
    pub max_page_size: NonZeroU32,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match &cli.command {
        Command::Key(_) => {}
        Command::Show(args) => raw.apply_runtime_overrides(&args.overrides),
        Command::Invalidate(args) | Command::Index(args) => {
            raw.apply_runtime_overrides(&args.overrides)
        }
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    redis: RawRedisSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_runtime_overrides(&mut self, overrides: &RuntimeOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.redis_url.as_ref() {
            self.redis.url = Some(url.clone());
        }
        if let Some(timeout) = overrides.cache_operation_timeout_ms {
            self.cache.operation_timeout_ms = Some(timeout);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            redis,
            cache,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let redis = build_redis_settings(redis)?;
        let cache = build_cache_settings(cache)?;

        Ok(Self {
            logging,
            redis,
            cache,
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

fn build_redis_settings(redis: RawRedisSettings) -> Result<RedisSettings, LoadError> {
    let url = redis
        .url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());
    if !(url.starts_with("redis://") || url.starts_with("rediss://") || url.starts_with("unix://"))
    {
        return Err(LoadError::invalid(
            "redis.url",
            format!("unsupported scheme in `{url}`"),
        ));
    }

    let pool_max_size = non_zero_u32(
        redis.pool_max_size.unwrap_or(DEFAULT_REDIS_POOL_MAX_SIZE),
        "redis.pool_max_size",
    )?;
    let connect_timeout_ms = non_zero_u64(
        redis
            .connect_timeout_ms
            .unwrap_or(DEFAULT_REDIS_CONNECT_TIMEOUT_MS),
        "redis.connect_timeout_ms",
    )?;

    Ok(RedisSettings {
        url,
        pool_max_size: pool_max_size.get() as usize,
        connect_timeout: Duration::from_millis(connect_timeout_ms),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let listing_ttl_secs = non_zero_u64(
        cache.listing_ttl_seconds.unwrap_or(DEFAULT_LISTING_TTL_SECS),
        "cache.listing_ttl_seconds",
    )?;
    let lock_ttl_secs = non_zero_u64(
        cache.lock_ttl_seconds.unwrap_or(DEFAULT_LOCK_TTL_SECS),
        "cache.lock_ttl_seconds",
    )?;
    if lock_ttl_secs > listing_ttl_secs {
        return Err(LoadError::invalid(
            "cache.lock_ttl_seconds",
            "must not exceed cache.listing_ttl_seconds",
        ));
    }
    let operation_timeout_ms = non_zero_u64(
        cache
            .operation_timeout_ms
            .unwrap_or(DEFAULT_OPERATION_TIMEOUT_MS),
        "cache.operation_timeout_ms",
    )?;
    let max_page_size = non_zero_u32(
        cache.max_page_size.unwrap_or(DEFAULT_MAX_PAGE_SIZE),
        "cache.max_page_size",
    )?;

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        listing_ttl: Duration::from_secs(listing_ttl_secs),
        lock_ttl: Duration::from_secs(lock_ttl_secs),
        operation_timeout: Duration::from_millis(operation_timeout_ms),
        max_page_size,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRedisSettings {
    url: Option<String>,
    pool_max_size: Option<u64>,
    connect_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    listing_ttl_seconds: Option<u64>,
    lock_ttl_seconds: Option<u64>,
    operation_timeout_ms: Option<u64>,
    max_page_size: Option<u64>,
}

fn non_zero_u64(value: u64, key: &'static str) -> Result<u64, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(value)
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
