//! Token wire format: HS256-signed JWT with the campus claim set.
//!
//! The codec is pure: encoding and decoding are deterministic given `now`,
//! and no I/O happens here. Expiry is checked against the caller-supplied
//! clock rather than by `jsonwebtoken`, so tests can drive time explicitly.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::AuthError;

/// Fixed token lifetime: 24 hours.
pub const TOKEN_LIFETIME_HOURS: i64 = 24;

/// Minimum accepted HMAC secret length (256 bits).
pub const MIN_SECRET_LEN: usize = 32;

/// Claim set carried by every issued token.
///
/// Field names are fixed by the wire format; `userId`/`userType` are the
/// camel-case names consumers of the payload expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: opaque username.
    pub username: String,
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "userType")]
    pub user_type: i32,
    /// Issued at (Unix timestamp, seconds).
    pub iat: i64,
    /// Expiration time (Unix timestamp, seconds).
    pub exp: i64,
}

/// Signs and verifies tokens with a single process-wide HS256 secret.
pub struct TokenCodec {
    header: Header,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Build a codec from the shared secret.
    ///
    /// Rejects secrets shorter than [`MIN_SECRET_LEN`] bytes with
    /// [`AuthError::WeakSecret`].
    pub fn new(secret: &[u8]) -> Result<Self, AuthError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::WeakSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is validated against the injected clock in `decode`, not by
        // the library against the system clock.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Ok(Self {
            header: Header::new(Algorithm::HS256),
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        })
    }

    /// Build and sign a token for the given subject.
    ///
    /// `iat` is `now`, `exp` is `now` + [`TOKEN_LIFETIME_HOURS`].
    pub fn encode(
        &self,
        username: &str,
        user_id: i64,
        user_type: i32,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            username: username.to_string(),
            user_id,
            user_type,
            iat: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp(),
        };

        encode(&self.header, &claims, &self.encoding).map_err(AuthError::Encoding)
    }

    /// Verify signature and expiry, returning the claims.
    ///
    /// The MAC comparison inside `jsonwebtoken` is constant-time. Error
    /// mapping:
    /// - wrong segment count / bad base64 / bad JSON -> [`AuthError::Malformed`]
    /// - MAC mismatch -> [`AuthError::SignatureInvalid`]
    /// - header declares an algorithm other than HS256 -> [`AuthError::UnsupportedAlgorithm`]
    /// - well-formed but `now` past `exp` -> [`AuthError::Expired`]
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|err| {
            match err.kind() {
                ErrorKind::InvalidSignature => AuthError::SignatureInvalid,
                ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                    AuthError::UnsupportedAlgorithm
                }
                _ => AuthError::Malformed,
            }
        })?;

        if now.timestamp() > data.claims.exp {
            return Err(AuthError::Expired);
        }

        Ok(data.claims)
    }
}
