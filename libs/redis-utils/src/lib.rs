//! Redis plumbing for the revocation denylist.
//!
//! Provides the shared connection handle and the Redis-backed
//! [`RevocationStore`] implementation. Every round trip is bounded by a
//! timeout so a slow Redis degrades into a store error instead of stalling
//! the request that triggered the check.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info};

use token_auth::revocation::{RevocationStore, StoreError};

/// Shared Redis connection manager guarded by a Tokio mutex.
pub type SharedConnectionManager = Arc<Mutex<ConnectionManager>>;

/// Per-operation timeout applied to every denylist round trip.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(2);

/// Connect and wrap the connection manager for sharing.
pub async fn connect(redis_url: &str) -> Result<SharedConnectionManager> {
    let client = Client::open(redis_url).context("failed to construct Redis client")?;
    let manager = ConnectionManager::new(client)
        .await
        .context("failed to initialize Redis connection manager")?;
    info!("Redis connection manager initialized");
    Ok(Arc::new(Mutex::new(manager)))
}

/// Denylist entries as TTL'd presence keys (`SET .. EX` / `EXISTS`).
pub struct RedisRevocationStore {
    conn: SharedConnectionManager,
    op_timeout: Duration,
}

impl RedisRevocationStore {
    pub fn new(conn: SharedConnectionManager) -> Self {
        Self {
            conn,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Remove an entry before its TTL runs out. Operational cleanup only;
    /// normal entries just expire.
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        match timeout(self.op_timeout, conn.del::<_, ()>(key)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(StoreError(err.to_string())),
            Err(_) => Err(StoreError(format!(
                "redis DEL timed out after {:?}",
                self.op_timeout
            ))),
        }
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn put(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        // Redis rejects a zero expiry; the authority never asks for one, but
        // clamp anyway.
        let ttl_secs = ttl.as_secs().max(1);
        let mut conn = self.conn.lock().await;
        match timeout(self.op_timeout, conn.set_ex::<_, _, ()>(key, "1", ttl_secs)).await {
            Ok(Ok(())) => {
                debug!(ttl_secs, "denylist entry written");
                Ok(())
            }
            Ok(Err(err)) => Err(StoreError(err.to_string())),
            Err(_) => Err(StoreError(format!(
                "redis SET timed out after {:?}",
                self.op_timeout
            ))),
        }
    }

    async fn has(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.lock().await;
        match timeout(self.op_timeout, conn.exists::<_, bool>(key)).await {
            Ok(Ok(exists)) => Ok(exists),
            Ok(Err(err)) => Err(StoreError(err.to_string())),
            Err(_) => Err(StoreError(format!(
                "redis EXISTS timed out after {:?}",
                self.op_timeout
            ))),
        }
    }
}
