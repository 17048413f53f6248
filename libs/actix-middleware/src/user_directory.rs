use async_trait::async_trait;
use thiserror::Error;

/// Application user record resolved from a token subject.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub username: String,
    pub user_id: i64,
    pub user_type: i32,
    pub display_name: Option<String>,
}

/// Lookup failure (backend unreachable, query error). Not "user missing" —
/// that is `Ok(None)`.
#[derive(Debug, Error)]
#[error("user directory lookup failed: {0}")]
pub struct DirectoryError(pub String);

/// User-lookup collaborator consumed by the authentication middleware.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn load_user(&self, username: &str) -> Result<Option<UserRecord>, DirectoryError>;
}
