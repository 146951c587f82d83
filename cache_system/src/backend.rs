//! Key-value backends
//!
//! `CacheBackend` is the seam between the cache layer and the external
//! store. `RedisBackend` talks to Redis over one multiplexed connection that
//! is opened at startup and shared for the process lifetime.

use crate::errors::{CacheError, CacheResult};
use async_trait::async_trait;
use redis::{AsyncCommands, Client};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// One page of a server-side key scan
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    /// Cursor for the next call; `0` once the scan is complete
    pub cursor: u64,
    pub keys: Vec<String>,
}

/// Raw operations the cache layer needs from a key-value store
#[async_trait]
pub trait CacheBackend: Send + Sync + Debug {
    /// `GET key`. A key holding something other than a text payload is
    /// reported as `CacheError::CorruptedEntry`.
    async fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// `SET key value EX seconds`
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// `DEL key [key ...]`, returns the number of keys removed
    async fn delete(&self, keys: &[String]) -> CacheResult<u64>;

    /// `SCAN cursor MATCH pattern COUNT count`
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> CacheResult<ScanPage>;

    /// `PING`
    async fn ping(&self) -> CacheResult<String>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// Redis-backed store
#[derive(Clone)]
pub struct RedisBackend {
    connection: Arc<RwLock<Option<redis::aio::MultiplexedConnection>>>,
}

impl Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let connection_status = {
            match self.connection.try_read() {
                Ok(conn) => {
                    if conn.is_some() {
                        "connected"
                    } else {
                        "closed"
                    }
                }
                Err(_) => "lock_error",
            }
        };

        f.debug_struct("RedisBackend")
            .field("connection", &connection_status)
            .finish()
    }
}

impl RedisBackend {
    /// Open the shared connection
    pub async fn connect(connection_string: &str, timeout: Duration) -> CacheResult<Self> {
        let client = Client::open(connection_string)
            .map_err(|e| CacheError::StoreUnavailable(e.to_string()))?;

        let connection = tokio::time::timeout(timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| {
                CacheError::StoreUnavailable(format!(
                    "connection to cache store timed out after {}ms",
                    timeout.as_millis()
                ))
            })?
            .map_err(|e| CacheError::StoreUnavailable(e.to_string()))?;

        tracing::info!("[CACHE_CONNECT] connected to Redis cache store");

        Ok(Self {
            connection: Arc::new(RwLock::new(Some(connection))),
        })
    }

    /// Drop the shared connection; later calls fail with `StoreUnavailable`
    pub async fn close(&self) {
        let mut conn = self.connection.write().await;
        if conn.take().is_some() {
            tracing::info!("[CACHE_CLOSE] Redis connection closed");
        }
    }

    async fn get_connection(&self) -> CacheResult<redis::aio::MultiplexedConnection> {
        let conn = self.connection.read().await;

        conn.as_ref()
            .cloned()
            .ok_or_else(|| CacheError::StoreUnavailable("connection is closed".into()))
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.get_connection().await?;
        let reply: Result<Option<Vec<u8>>, _> = conn.get(key).await;

        let bytes = match reply.map_err(CacheError::from) {
            Ok(bytes) => bytes,
            // WRONGTYPE and similar: the key exists but holds no payload of ours
            Err(CacheError::Rejected(reason)) => return Err(corrupted(key, reason)),
            Err(e) => return Err(e),
        };

        bytes
            .map(|bytes| String::from_utf8(bytes).map_err(|e| corrupted(key, e.to_string())))
            .transpose()
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let seconds = ttl_seconds(ttl)?;
        let mut conn = self.get_connection().await?;
        let _: () = conn.set_ex(key, value, seconds).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> CacheResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.get_connection().await?;
        let deleted: u64 = conn.del(keys).await?;
        Ok(deleted)
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> CacheResult<ScanPage> {
        let mut conn = self.get_connection().await?;

        let (cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        Ok(ScanPage { cursor, keys })
    }

    async fn ping(&self) -> CacheResult<String> {
        let mut conn = self.get_connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

fn corrupted(key: &str, reason: String) -> CacheError {
    CacheError::CorruptedEntry {
        key: key.to_string(),
        reason,
    }
}

/// Whole seconds for `EX`; sub-second remainders round up
pub(crate) fn ttl_seconds(ttl: Duration) -> CacheResult<u64> {
    if ttl.is_zero() {
        return Err(CacheError::InvalidTtl(0));
    }

    let seconds = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    Ok(seconds)
}
