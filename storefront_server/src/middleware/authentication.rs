//! Bearer token authentication for the `/api` scope.
//!
//! Reads the `Authorization: Bearer <token>` header, resolves the token into a [`Session`] through the
//! [`AuthApi`] registered as app data, and stores the session in the request extensions for the
//! [ACL middleware](super::AclMiddlewareFactory) and the [`AuthSession`](crate::auth::AuthSession) extractor.
//!
//! The factory is generic over the session backend, since actix cannot look up app data by trait.
use std::{
    future::{ready, Ready},
    marker::PhantomData,
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    web,
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::{debug, trace, warn};
use storefront_engine::{AuthApi, AuthManagement};

use crate::{
    errors::{AuthError, ServerError},
    helpers::bearer_token,
};

pub struct AuthenticationMiddlewareFactory<A> {
    _backend: PhantomData<fn() -> A>,
}

impl<A> AuthenticationMiddlewareFactory<A> {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self { _backend: PhantomData }
    }
}

impl<S, B, A> Transform<S, ServiceRequest> for AuthenticationMiddlewareFactory<A>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    A: AuthManagement + 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = AuthenticationMiddlewareService<S, A>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthenticationMiddlewareService { service: Rc::new(service), _backend: PhantomData }))
    }
}

pub struct AuthenticationMiddlewareService<S, A> {
    service: Rc<S>,
    _backend: PhantomData<fn() -> A>,
}

impl<S, B, A> Service<ServiceRequest> for AuthenticationMiddlewareService<S, A>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
    A: AuthManagement + 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        Box::pin(async move {
            trace!("🔐️ Authenticating request to {}", req.path());
            let token = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(bearer_token)
                .map(String::from)
                .ok_or_else(|| {
                    debug!("🔐️ No bearer token in request to {}", req.path());
                    ServerError::AuthenticationError(AuthError::MissingToken)
                })?;
            let api = req.app_data::<web::Data<AuthApi<A>>>().cloned().ok_or_else(|| {
                warn!("🔐️ The authentication API has not been registered with the app");
                ServerError::InitializeError("Authentication is not configured".into())
            })?;
            let session = api.authenticate(&token).await.map_err(ServerError::from)?;
            trace!("🔐️ Request authenticated for buyer #{}", session.buyer_id);
            req.extensions_mut().insert(session);
            service.call(req).await
        })
    }
}
