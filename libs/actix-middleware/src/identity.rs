use actix_web::dev::Payload;
use actix_web::{error::ErrorUnauthorized, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, Ready};

/// Verified identity attached to a single request.
///
/// Lives only in the request's extensions; never persisted or shared across
/// requests.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    pub username: String,
    pub user_id: i64,
    pub user_type: i32,
}

/// Extractor for handlers that require authentication.
///
/// Rejects with 401 when the authentication middleware attached no identity.
/// Handlers that merely want to know whether a caller is authenticated can
/// take `Option<AuthenticatedIdentity>` instead.
impl FromRequest for AuthenticatedIdentity {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedIdentity>() {
            Some(identity) => ready(Ok(identity.clone())),
            None => ready(Err(ErrorUnauthorized("User not authenticated"))),
        }
    }
}
