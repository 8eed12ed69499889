//! Redis implementation of the cache backend.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime};
use redis::{AsyncCommands, RedisError};
use tracing::info;

use crate::cache::{CacheBackend, CacheError};
use crate::config::RedisSettings;

use super::error::InfraError;

const BACKEND: &str = "redis";

/// Build a connection pool. Connections are opened lazily, so an unreachable
/// server surfaces as per-operation errors rather than here.
pub fn connect(settings: &RedisSettings) -> Result<Pool, InfraError> {
    let mut pool_config = PoolConfig::new(settings.pool_max_size);
    pool_config.timeouts.wait = Some(settings.connect_timeout);
    pool_config.timeouts.create = Some(settings.connect_timeout);
    pool_config.timeouts.recycle = Some(settings.connect_timeout);

    let mut config = Config::from_url(settings.url.as_str());
    config.pool = Some(pool_config);

    let pool = config
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|err| InfraError::redis(format!("failed to create pool: {err}")))?;
    info!(
        url = %redacted(&settings.url),
        max_size = settings.pool_max_size,
        "Redis pool created"
    );
    Ok(pool)
}

#[derive(Clone)]
pub struct RedisBackend {
    pool: Pool,
}

impl RedisBackend {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn conn(&self, op: &'static str) -> Result<Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|err| CacheError::backend(BACKEND, op, err))
    }
}

fn map_err(op: &'static str, key: &str, err: RedisError) -> CacheError {
    if err.code() == Some("WRONGTYPE") {
        return CacheError::wrong_type(key);
    }
    CacheError::backend(BACKEND, op, err)
}

fn millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Strip credentials from a connection URL before logging it.
fn redacted(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn("get").await?;
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(|e| map_err("get", key, e))?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn("set").await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| map_err("set", key, e))?;
        Ok(())
    }

    async fn set_nx_ex(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let mut conn = self.conn("set_nx").await?;
        // Nil reply when the key already exists.
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| map_err("set_nx", key, e))?;
        Ok(reply.is_some())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn("del").await?;
        let removed: u64 = conn
            .del(keys)
            .await
            .map_err(|e| CacheError::backend(BACKEND, "del", e))?;
        Ok(removed)
    }

    async fn add_member(&self, key: &str, member: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn("sadd").await?;
        let ttl_ms = i64::try_from(millis(ttl)).unwrap_or(i64::MAX);
        let _: () = redis::pipe()
            .atomic()
            .sadd(key, member)
            .ignore()
            .pexpire(key, ttl_ms)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| map_err("sadd", key, e))?;
        Ok(())
    }

    async fn add_to_sets(
        &self,
        keys: &[String],
        member: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn("sadd").await?;
        let ttl_ms = i64::try_from(millis(ttl)).unwrap_or(i64::MAX);
        let mut pipe = redis::pipe();
        pipe.atomic();
        for key in keys {
            pipe.sadd(key, member).ignore().pexpire(key, ttl_ms).ignore();
        }
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::backend(BACKEND, "sadd", e))?;
        Ok(())
    }

    async fn members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn("smembers").await?;
        let members: Vec<String> = conn
            .smembers(key)
            .await
            .map_err(|e| map_err("smembers", key, e))?;
        Ok(members)
    }

    async fn remove_members(&self, key: &str, members: &[String]) -> Result<u64, CacheError> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn("srem").await?;
        let removed: u64 = conn
            .srem(key, members)
            .await
            .map_err(|e| map_err("srem", key, e))?;
        Ok(removed)
    }
}
