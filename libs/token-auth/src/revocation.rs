//! Denylist interface for server-side token revocation.
//!
//! The store is an external collaborator (Redis in production). Entries are
//! presence markers with a TTL; absence means "not revoked". Keys are the
//! SHA-256 of the token, prefixed, so live credentials never land in the
//! store.

use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Key namespace for denylist entries.
pub const BLACKLIST_KEY_PREFIX: &str = "jwt:blacklist:";

/// Backend failure during a denylist round trip (unreachable, timeout).
#[derive(Debug, Error)]
#[error("revocation store unavailable: {0}")]
pub struct StoreError(pub String);

/// TTL-capable presence store consumed by [`crate::TokenAuthority`].
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Record `key` for `ttl`. Idempotent: re-putting overwrites the TTL.
    ///
    /// Failures must surface as errors; a dropped revocation is a security
    /// defect, not a degraded check.
    async fn put(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Membership check. `Ok(false)` means "not revoked".
    async fn has(&self, key: &str) -> Result<bool, StoreError>;
}

/// Null-object store for deployments without revocation support.
///
/// Nothing is ever denylisted; `put` succeeds and drops the entry. Using this
/// collaborator is how the "no revocation" mode works without forking the
/// authority logic.
pub struct NoopRevocationStore;

#[async_trait]
impl RevocationStore for NoopRevocationStore {
    async fn put(&self, _key: &str, _ttl: Duration) -> Result<(), StoreError> {
        Ok(())
    }

    async fn has(&self, _key: &str) -> Result<bool, StoreError> {
        Ok(false)
    }
}

/// Denylist key for a presented token: prefix + hex(SHA-256(token)).
pub fn denylist_key(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    format!("{}{}", BLACKLIST_KEY_PREFIX, hex::encode(digest))
}
