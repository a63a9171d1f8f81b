use actix_session::{Session, SessionExt, SessionGetError, SessionInsertError};
use actix_web::{dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform}, error::ErrorUnauthorized, FromRequest};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use serde::{de::DeserializeOwned, Serialize};
use tracing::Instrument;
use uuid::Uuid;

use crate::{auth::extractors::{resolve_identity, Identity}, domain::account_kind::AccountKind};

const USER_ID_KEY: &str = "user_id";
const ACCOUNT_KIND_KEY: &str = "account_kind";

pub struct TypedSession(pub Session);

impl TypedSession {
    pub fn renew(&self){
        self.0.renew();
    }

    pub fn purge(&self){
        self.0.purge();
    }

    pub fn insert_identity(&self, user_id: Uuid, kind: AccountKind) -> Result<(), SessionInsertError>{
        self.0.insert(USER_ID_KEY, user_id)?;
        self.0.insert(ACCOUNT_KIND_KEY, kind)
    }

    pub fn get_identity(&self) -> Result<Option<Identity>, SessionGetError>{
        let user_id: Option<Uuid> = self.0.get(USER_ID_KEY)?;
        let kind: Option<AccountKind> = self.0.get(ACCOUNT_KIND_KEY)?;

        Ok(match (user_id, kind) {
            (Some(user_id), Some(kind)) => Some(Identity{ user_id, kind }),
            _ => None
        })
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionGetError>{
        self.0.get(key)
    }

    pub fn insert_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), SessionInsertError>{
        self.0.insert(key, value)
    }

    pub fn remove(&self, key: &str){
        self.0.remove(key);
    }
}

impl FromRequest for TypedSession {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &actix_web::HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let session = req.get_session();
        ready(Ok(TypedSession(session)))
    }
}

/// Rejects requests that carry neither a logged in session nor a valid
/// bearer token.
pub struct SessionMiddlewareFactory;

impl<S> Transform<S, ServiceRequest> for SessionMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = actix_web::Error>,
    S::Future: 'static,
{
    type Response = ServiceResponse;
    type Error = actix_web::Error;
    type InitError = ();
    type Transform = RouteSessionMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RouteSessionMiddleware{service}))
    }
}

pub struct RouteSessionMiddleware<S>{
    service: S
}

impl<S> Service<ServiceRequest> for RouteSessionMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse, Error = actix_web::Error>,
    S::Future: 'static
{
        type Error = actix_web::Error;
        type Response = S::Response;
        type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

        forward_ready!(service);

        #[tracing::instrument(
            "Checking if user is authenticated to access service",
            skip(self, req)
        )]
        fn call(&self, req: ServiceRequest) -> Self::Future {
            let current_span = tracing::Span::current();

            match resolve_identity(req.request()) {
                Ok(Some(_)) => {},
                Ok(None) => {
                    return Box::pin(ready(
                        Err(ErrorUnauthorized("Not logged in"))
                    ).instrument(current_span))
                },
                Err(e) => {
                    return Box::pin(ready(Err(e)).instrument(current_span))
                }
            }

            let fut = self.service.call(req);

            Box::pin(async move {
                let res = fut.await?;
                Ok(res)
            }
            .instrument(current_span))
        }
}
