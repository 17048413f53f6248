//! Bearer-token authentication middleware.
//!
//! Runs once per request before handler logic. A valid token gets an
//! [`AuthenticatedIdentity`] attached to the request extensions; everything
//! else passes through unauthenticated. Rejecting unauthenticated access is
//! the authorization layer's job (the [`AuthenticatedIdentity`] extractor),
//! not this filter's, so no failure path here ever aborts the pipeline.

use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpMessage};
use futures::future::{ready, Ready};
use tracing::{debug, warn};

use token_auth::TokenAuthority;

use crate::identity::AuthenticatedIdentity;
use crate::user_directory::{UserDirectory, UserRecord};

/// JWT authentication middleware.
///
/// Wrap it around the app or a scope:
/// `App::new().wrap(JwtAuthentication::new(authority))`. When a user
/// directory is configured, the token subject is resolved to a full
/// [`UserRecord`] and the identity is only attached when that lookup
/// succeeds; directory failures degrade to an unauthenticated request.
pub struct JwtAuthentication {
    authority: Arc<TokenAuthority>,
    directory: Option<Arc<dyn UserDirectory>>,
}

impl JwtAuthentication {
    pub fn new(authority: Arc<TokenAuthority>) -> Self {
        Self {
            authority,
            directory: None,
        }
    }

    pub fn with_user_directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtAuthenticationService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthenticationService {
            service: Rc::new(service),
            authority: self.authority.clone(),
            directory: self.directory.clone(),
        }))
    }
}

pub struct JwtAuthenticationService<S> {
    service: Rc<S>,
    authority: Arc<TokenAuthority>,
    directory: Option<Arc<dyn UserDirectory>>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthenticationService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let authority = self.authority.clone();
        let directory = self.directory.clone();

        Box::pin(async move {
            if let Some((identity, record)) =
                resolve_identity(&req, &authority, directory.as_deref()).await
            {
                req.extensions_mut().insert(identity);
                if let Some(record) = record {
                    req.extensions_mut().insert(record);
                }
            }
            service.call(req).await
        })
    }
}

/// Authenticate the request, returning the identity to attach, if any.
///
/// `None` covers every pass-through case: no credential presented, token
/// rejected, directory lookup failed, or an identity was already attached by
/// an earlier pass (the filter never overrides an existing identity, which
/// also makes double-wrapped pipelines effectively run it once).
async fn resolve_identity(
    req: &ServiceRequest,
    authority: &TokenAuthority,
    directory: Option<&dyn UserDirectory>,
) -> Option<(AuthenticatedIdentity, Option<UserRecord>)> {
    if req.extensions().get::<AuthenticatedIdentity>().is_some() {
        return None;
    }

    let token = req
        .headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;

    let claims = match authority.authenticate(token).await {
        Ok(claims) => claims,
        Err(err) => {
            debug!(error = %err, "bearer token rejected");
            return None;
        }
    };

    let record = match directory {
        Some(directory) => match directory.load_user(&claims.username).await {
            Ok(Some(record)) => Some(record),
            Ok(None) => {
                warn!(username = %claims.username, "token subject unknown to user directory");
                return None;
            }
            Err(err) => {
                warn!(
                    username = %claims.username,
                    error = %err,
                    "user directory lookup failed; request proceeds unauthenticated"
                );
                return None;
            }
        },
        None => None,
    };

    Some((
        AuthenticatedIdentity {
            username: claims.username,
            user_id: claims.user_id,
            user_type: claims.user_type,
        },
        record,
    ))
}
