//! Stateless session-token authentication with server-side revocation.
//!
//! Tokens are self-contained HS256 JWTs: issuing a token requires no server
//! state, and verifying one only touches the revocation store to check the
//! denylist. Revoking a token writes a TTL'd denylist entry so the token dies
//! before its signed expiry.
//!
//! The primary API is [`TokenAuthority`], constructed once at process start
//! with the shared secret and a [`RevocationStore`] collaborator and passed by
//! handle to everything that needs it. There is no global state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod codec;
pub mod revocation;
pub mod test_utils;

pub use codec::{Claims, TokenCodec, MIN_SECRET_LEN, TOKEN_LIFETIME_HOURS};
pub use revocation::{
    denylist_key, NoopRevocationStore, RevocationStore, StoreError, BLACKLIST_KEY_PREFIX,
};

/// Denylist TTL applied when a revoked token is already expired (or expires
/// within the same second). Guards the replay window left by clock skew.
pub const FALLBACK_REVOCATION_TTL: Duration = Duration::from_secs(3600);

/// Why a presented token was rejected, or why an operation failed.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Structurally invalid: wrong segment count, bad base64, bad JSON.
    #[error("malformed token")]
    Malformed,
    /// MAC mismatch: tampered payload or wrong key.
    #[error("token signature invalid")]
    SignatureInvalid,
    /// Well-formed and correctly signed, but past `exp`.
    #[error("token expired")]
    Expired,
    /// Header declares a signing algorithm this authority does not trust.
    #[error("unsupported signing algorithm")]
    UnsupportedAlgorithm,
    /// Denylisted before its natural expiry.
    #[error("token has been revoked")]
    Revoked,
    /// Signing secret below the minimum length.
    #[error("signing secret must be at least 32 bytes")]
    WeakSecret,
    /// Token serialization failed; does not occur for well-formed claims.
    #[error("failed to encode token: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),
    /// Revocation backend unreachable or timed out.
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

/// Behavior of `validate`/`authenticate` when the revocation store errors.
///
/// Revocation-store health must not silently decide authentication behavior;
/// this is the explicit knob. `revoke` is unaffected: store failures there
/// always propagate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevocationPolicy {
    /// Treat the denylist check as degraded and continue with signature and
    /// expiry verification only. Authentication availability does not depend
    /// on denylist-store health. Default.
    #[default]
    FailOpen,
    /// Reject every token while the store is unreachable.
    FailClosed,
}

/// Time source, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Issues, validates, and revokes tokens.
///
/// Immutable after construction; share via `Arc`. All shared mutable state
/// (the denylist) lives in the external store, so concurrent calls need no
/// locking here.
pub struct TokenAuthority {
    codec: TokenCodec,
    store: Arc<dyn RevocationStore>,
    policy: RevocationPolicy,
    clock: Arc<dyn Clock>,
}

impl TokenAuthority {
    /// Build an authority from the shared secret and a revocation store.
    ///
    /// Use [`NoopRevocationStore`] for deployments without revocation.
    pub fn new(secret: &[u8], store: Arc<dyn RevocationStore>) -> Result<Self, AuthError> {
        Ok(Self {
            codec: TokenCodec::new(secret)?,
            store,
            policy: RevocationPolicy::default(),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_policy(mut self, policy: RevocationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Issue a 24-hour token for the given subject.
    ///
    /// Pure token creation: no store round trip, no health probing.
    pub fn issue(&self, username: &str, user_id: i64, user_type: i32) -> Result<String, AuthError> {
        let token = self.codec.encode(username, user_id, user_type, self.clock.now())?;
        debug!(username, user_id, user_type, "issued token");
        Ok(token)
    }

    /// Full validation: denylist membership first, then signature and expiry.
    ///
    /// The denylist check comes first so the "is this presented credential
    /// usable" decision is centralized here, and a revoked token is rejected
    /// regardless of its cryptographic state. Store failures follow the
    /// configured [`RevocationPolicy`].
    pub async fn authenticate(&self, token: &str) -> Result<Claims, AuthError> {
        match self.store.has(&denylist_key(token)).await {
            Ok(true) => return Err(AuthError::Revoked),
            Ok(false) => {}
            Err(err) => match self.policy {
                RevocationPolicy::FailOpen => {
                    warn!(error = %err, "revocation check degraded; continuing fail-open");
                }
                RevocationPolicy::FailClosed => return Err(AuthError::StoreUnavailable(err)),
            },
        }

        self.codec.decode(token, self.clock.now())
    }

    /// Boolean convenience wrapper over [`Self::authenticate`].
    pub async fn validate(&self, token: &str) -> bool {
        self.authenticate(token).await.is_ok()
    }

    /// Denylist a token for the remainder of its lifetime.
    ///
    /// An expired token is still denylisted for [`FALLBACK_REVOCATION_TTL`]:
    /// clock skew can leave a very-recently-expired token replayable, and the
    /// floor closes that window. A token that fails to parse or verify cannot
    /// be meaningfully revoked and returns that decode error with no store
    /// write. Store failures propagate: a logout that silently leaves the
    /// token valid would be a security defect.
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let now = self.clock.now();
        let ttl = match self.codec.decode(token, now) {
            Ok(claims) => {
                let remaining = claims.exp - now.timestamp();
                if remaining > 0 {
                    Duration::from_secs(remaining as u64)
                } else {
                    FALLBACK_REVOCATION_TTL
                }
            }
            Err(AuthError::Expired) => FALLBACK_REVOCATION_TTL,
            Err(err) => return Err(err),
        };

        self.store.put(&denylist_key(token), ttl).await?;
        info!(ttl_secs = ttl.as_secs(), "token revoked");
        Ok(())
    }

    /// Decode a token's claims without consulting the denylist.
    ///
    /// `None` on any decode failure (malformed, bad signature, expired);
    /// claim extraction never aborts the caller.
    pub fn extract_claims(&self, token: &str) -> Option<Claims> {
        self.codec.decode(token, self.clock.now()).ok()
    }

    pub fn extract_username(&self, token: &str) -> Option<String> {
        self.extract_claims(token).map(|claims| claims.username)
    }

    pub fn extract_user_id(&self, token: &str) -> Option<i64> {
        self.extract_claims(token).map(|claims| claims.user_id)
    }

    pub fn extract_user_type(&self, token: &str) -> Option<i32> {
        self.extract_claims(token).map(|claims| claims.user_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ManualClock, MockRevocationStore};
    use chrono::Duration as ChronoDuration;

    const SECRET: &[u8] = b"vCampusSecretKey1234567890abcdefghijklmnopqrstuvwxyz";

    fn authority_with(
        store: Arc<MockRevocationStore>,
        clock: Arc<ManualClock>,
    ) -> TokenAuthority {
        match TokenAuthority::new(SECRET, store) {
            Ok(authority) => authority.with_clock(clock),
            Err(err) => panic!("authority construction failed: {err}"),
        }
    }

    fn fixture() -> (TokenAuthority, Arc<MockRevocationStore>, Arc<ManualClock>) {
        let store = Arc::new(MockRevocationStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        (authority_with(store.clone(), clock.clone()), store, clock)
    }

    #[tokio::test]
    async fn issued_token_validates_immediately() {
        let (authority, _, _) = fixture();
        let token = authority.issue("alice", 42, 1).unwrap();
        assert!(authority.validate(&token).await);
    }

    #[tokio::test]
    async fn token_stops_validating_after_lifetime() {
        let (authority, _, clock) = fixture();
        let token = authority.issue("alice", 42, 1).unwrap();

        clock.advance(ChronoDuration::hours(25));
        assert!(!authority.validate(&token).await);
        assert!(matches!(
            authority.authenticate(&token).await,
            Err(AuthError::Expired)
        ));
    }

    #[tokio::test]
    async fn revoked_token_stops_validating_before_expiry() {
        let (authority, _, clock) = fixture();
        let token = authority.issue("alice", 42, 1).unwrap();
        assert!(authority.validate(&token).await);

        authority.revoke(&token).await.unwrap();
        assert!(!authority.validate(&token).await);
        assert!(matches!(
            authority.authenticate(&token).await,
            Err(AuthError::Revoked)
        ));

        // A fresh token for the same user is unaffected. HS256 tokens are
        // deterministic, so move the clock to get a distinct `iat`.
        clock.advance(ChronoDuration::seconds(1));
        let fresh = authority.issue("alice", 42, 1).unwrap();
        assert!(authority.validate(&fresh).await);
    }

    #[tokio::test]
    async fn revoke_uses_remaining_lifetime_as_ttl() {
        let (authority, store, clock) = fixture();
        let token = authority.issue("alice", 42, 1).unwrap();

        clock.advance(ChronoDuration::hours(1));
        authority.revoke(&token).await.unwrap();

        let ttl = store.ttl_of(&denylist_key(&token)).unwrap();
        assert_eq!(ttl, Duration::from_secs(23 * 3600));
    }

    #[tokio::test]
    async fn revoking_expired_token_applies_fallback_ttl() {
        let (authority, store, clock) = fixture();
        let token = authority.issue("alice", 42, 1).unwrap();

        clock.advance(ChronoDuration::hours(30));
        authority.revoke(&token).await.unwrap();

        let ttl = store.ttl_of(&denylist_key(&token)).unwrap();
        assert_eq!(ttl, FALLBACK_REVOCATION_TTL);
    }

    #[tokio::test]
    async fn revoking_malformed_token_writes_nothing() {
        let (authority, store, _) = fixture();

        let result = authority.revoke("definitely-not-a-jwt").await;
        assert!(matches!(result, Err(AuthError::Malformed)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn revoking_tampered_token_writes_nothing() {
        let (authority, store, _) = fixture();
        let token = authority.issue("alice", 42, 1).unwrap();
        let flipped = if token.ends_with('A') { "B" } else { "A" };
        let tampered = format!("{}{}", &token[..token.len() - 1], flipped);

        let result = authority.revoke(&tampered).await;
        assert!(matches!(result, Err(AuthError::SignatureInvalid)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn tampered_payload_fails_validation() {
        let (authority, _, _) = fixture();
        let token = authority.issue("alice", 42, 1).unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        use base64::engine::general_purpose::URL_SAFE_NO_PAD;
        use base64::Engine;
        let payload = URL_SAFE_NO_PAD.decode(parts[1]).unwrap();
        let mut claims: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        claims["userType"] = serde_json::json!(9);
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap()),
            parts[2]
        );

        assert!(!authority.validate(&forged).await);
    }

    #[tokio::test]
    async fn store_outage_fails_open_by_default() {
        let (authority, store, _) = fixture();
        let token = authority.issue("alice", 42, 1).unwrap();

        store.set_failing(true);
        assert!(authority.validate(&token).await);
    }

    #[tokio::test]
    async fn store_outage_fails_closed_when_configured() {
        let store = Arc::new(MockRevocationStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let authority = authority_with(store.clone(), clock)
            .with_policy(RevocationPolicy::FailClosed);
        let token = authority.issue("alice", 42, 1).unwrap();

        store.set_failing(true);
        assert!(!authority.validate(&token).await);
        assert!(matches!(
            authority.authenticate(&token).await,
            Err(AuthError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn revoke_propagates_store_outage() {
        let (authority, store, _) = fixture();
        let token = authority.issue("alice", 42, 1).unwrap();

        store.set_failing(true);
        assert!(matches!(
            authority.revoke(&token).await,
            Err(AuthError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn noop_store_disables_revocation() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let authority = TokenAuthority::new(SECRET, Arc::new(NoopRevocationStore))
            .unwrap_or_else(|err| panic!("authority construction failed: {err}"))
            .with_clock(clock);
        let token = authority.issue("alice", 42, 1).unwrap();

        authority.revoke(&token).await.unwrap();
        // No denylist, so the token stays valid until it expires.
        assert!(authority.validate(&token).await);
    }

    #[test]
    fn extraction_returns_claims_for_valid_tokens() {
        let (authority, _, _) = fixture();
        let token = authority.issue("alice", 42, 1).unwrap();

        assert_eq!(authority.extract_username(&token).as_deref(), Some("alice"));
        assert_eq!(authority.extract_user_id(&token), Some(42));
        assert_eq!(authority.extract_user_type(&token), Some(1));
    }

    #[test]
    fn extraction_is_absent_for_bad_tokens() {
        let (authority, _, clock) = fixture();

        assert!(authority.extract_claims("garbage").is_none());
        assert!(authority.extract_username("a.b.c").is_none());

        let token = authority.issue("alice", 42, 1).unwrap();
        clock.advance(ChronoDuration::hours(25));
        assert!(authority.extract_claims(&token).is_none());
        assert!(authority.extract_user_id(&token).is_none());
    }

    #[tokio::test]
    async fn end_to_end_issue_revoke_reissue() {
        let (authority, _, clock) = fixture();

        let token = authority.issue("alice", 42, 1).unwrap();
        let claims = authority.extract_claims(&token).unwrap();
        assert_eq!(
            (claims.username.as_str(), claims.user_id, claims.user_type),
            ("alice", 42, 1)
        );

        authority.revoke(&token).await.unwrap();
        assert!(!authority.validate(&token).await);

        clock.advance(ChronoDuration::seconds(1));
        let fresh = authority.issue("alice", 42, 1).unwrap();
        assert!(authority.validate(&fresh).await);
    }
}
