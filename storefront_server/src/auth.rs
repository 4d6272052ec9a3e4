//! Request-level access to the caller's session.
//!
//! Bearer tokens are issued by the external authentication service. The
//! [`AuthenticationMiddlewareFactory`](crate::middleware::AuthenticationMiddlewareFactory) resolves the token into a
//! [`Session`] and stores it in the request extensions. Handlers then take an [`AuthSession`] argument to get at it.
use std::ops::Deref;

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use futures::future::{ready, Ready};
use log::warn;
use storefront_engine::db_types::Session;

use crate::errors::{AuthError, ServerError};

#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

impl AuthSession {
    pub fn buyer_id(&self) -> i64 {
        self.0.buyer_id
    }

    pub fn into_inner(self) -> Session {
        self.0
    }
}

impl Deref for AuthSession {
    type Target = Session;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for AuthSession {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let session = req.extensions().get::<Session>().cloned();
        let result = session.map(AuthSession).ok_or_else(|| {
            warn!("🔐️ No session found in request extensions. Is the route outside the authenticated scope?");
            ServerError::AuthenticationError(AuthError::MissingToken)
        });
        ready(result)
    }
}
