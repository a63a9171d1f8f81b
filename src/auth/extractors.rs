use actix_session::SessionExt;
use actix_web::{error::{ErrorForbidden, ErrorInternalServerError, ErrorUnauthorized}, http::header, web, FromRequest, HttpRequest};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use uuid::Uuid;

use super::jwt::Tokenizer;
use crate::{
    db_interaction::restaurants::get_active_account_for_user,
    domain::account_kind::AccountKind,
    models::RestaurantAccount,
    session_state::TypedSession,
    utils::{get_pooled_connection, DbPool}
};

// Who is calling, as established at login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity{
    pub user_id: Uuid,
    pub kind: AccountKind
}

fn bearer_token(req: &HttpRequest) -> Option<&str>{
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves the caller from an `Authorization: Bearer` token, falling back to
/// the cookie session. A present but invalid token is rejected outright.
pub fn resolve_identity(req: &HttpRequest) -> Result<Option<Identity>, actix_web::Error>{
    if let Some(token) = bearer_token(req) {
        let tokenizer = req.app_data::<web::Data<Tokenizer>>()
            .ok_or_else(|| ErrorInternalServerError("Tokenizer not configured"))?;

        return match tokenizer.decode_key(token) {
            Some(claims) => Ok(Some(Identity{ user_id: claims.sub, kind: claims.kind })),
            None => Err(ErrorUnauthorized("Invalid token"))
        }
    }

    TypedSession(req.get_session())
        .get_identity()
        .map_err(ErrorInternalServerError)
}

// Extractor for any logged in user
pub struct CurrentUser(pub Identity);

impl FromRequest for CurrentUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        ready(match resolve_identity(req) {
            Ok(Some(identity)) => Ok(CurrentUser(identity)),
            Ok(None) => Err(ErrorUnauthorized("Not logged in")),
            Err(e) => Err(e)
        })
    }
}

// Extractor for routes open to guests that attach the user when logged in
pub struct MaybeUser(pub Option<Identity>);

impl FromRequest for MaybeUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        ready(resolve_identity(req).map(MaybeUser))
    }
}

// Extractor for superuser role
pub struct IsSuperuser(pub Uuid);

impl FromRequest for IsSuperuser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        ready(match resolve_identity(req) {
            Ok(Some(Identity{ user_id, kind: AccountKind::Superuser })) => Ok(IsSuperuser(user_id)),
            Ok(Some(_)) => Err(ErrorForbidden("Unauthorized Role")),
            Ok(None) => Err(ErrorUnauthorized("Not logged in")),
            Err(e) => Err(e)
        })
    }
}

/// Extractor for restaurant account holders. The account is loaded on every
/// request so a ban takes effect immediately.
pub struct RestaurantOwner{
    pub user_id: Uuid,
    pub account: RestaurantAccount
}

impl RestaurantOwner {
    pub fn restaurant_id(&self) -> Uuid{
        self.account.restaurant_id
    }
}

impl FromRequest for RestaurantOwner {
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let identity = resolve_identity(req);
        let pool = req.app_data::<web::Data<DbPool>>().cloned();

        Box::pin(async move {
            let identity = identity?.ok_or_else(|| ErrorUnauthorized("Not logged in"))?;
            let pool = pool.ok_or_else(|| ErrorInternalServerError("Database pool not configured"))?;

            let conn = get_pooled_connection(&pool)
                .await
                .map_err(ErrorInternalServerError)?;

            match get_active_account_for_user(conn, identity.user_id)
                .await
                .map_err(ErrorInternalServerError)?
            {
                Some(account) => Ok(RestaurantOwner{ user_id: identity.user_id, account }),
                None => Err(ErrorForbidden("No active restaurant account"))
            }
        })
    }
}
