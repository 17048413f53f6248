//! # Actix Middleware Library
//!
//! Request-side authentication for actix services.
//!
//! ## Modules
//! - `jwt_auth`: bearer-token authentication middleware
//! - `identity`: request-scoped authenticated identity + extractor
//! - `user_directory`: user-lookup collaborator interface

pub mod identity;
pub mod jwt_auth;
pub mod user_directory;

pub use identity::AuthenticatedIdentity;
pub use jwt_auth::JwtAuthentication;
pub use user_directory::{DirectoryError, UserDirectory, UserRecord};
