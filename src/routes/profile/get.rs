use std::{error::Error, fmt::Debug};

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use anyhow::Context;
use serde_json::json;
use thiserror::Error;

use crate::{
    auth::extractors::CurrentUser,
    db_interaction::user::get_user_profile_info,
    routes::error_message,
    utils::{error_fmt_chain, get_pooled_connection, DbPool}
};

#[derive(Error)]
pub enum GetProfileError {
    #[error("No profile found for this user")]
    NotFound,
    #[error("Unexpected Error Occured")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for GetProfileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for GetProfileError {
    fn status_code(&self) -> StatusCode {
        match self {
            GetProfileError::NotFound => StatusCode::NOT_FOUND,
            GetProfileError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        error_message(self.status_code(), self)
    }
}

#[tracing::instrument(
    "Get profile data of logged in user",
    skip(pool, user),
    fields(user_id = %user.0.user_id)
)]
pub async fn get_profile(
    pool: web::Data<DbPool>,
    user: CurrentUser
) -> Result<HttpResponse, GetProfileError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let (user, profile) = get_user_profile_info(conn, user.0.user_id)
        .await?
        .ok_or(GetProfileError::NotFound)?;

    Ok(HttpResponse::Ok().json(json!({
        "user": user,
        "profile": profile
    })))
}
