use std::{error::Error, fmt::Debug};

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use anyhow::Context;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    auth::jwt::Tokenizer,
    db_interaction::user::find_user_for_login,
    domain::account_kind::AccountKind,
    password::verify_password,
    routes::error_message,
    session_state::TypedSession,
    utils::{error_fmt_chain, get_pooled_connection, DbPool}
};

#[derive(Deserialize, Debug)]
pub struct LoginForm{
    // Either the username or the email address
    pub login: String,
    pub password: SecretString
}

#[derive(Serialize)]
pub struct LoginResponse{
    pub token: String,
    pub account_kind: AccountKind,
    pub user_id: Uuid
}

#[derive(Error)]
pub enum LoginError{
    #[error("Username or password is incorrect")]
    InvalidCredentials,
    #[error("Failed to login")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for LoginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for LoginError {
    fn status_code(&self) -> StatusCode {
        match self {
            LoginError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            LoginError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        error_message(self.status_code(), self)
    }
}

#[tracing::instrument(
    "Logging in user",
    skip(pool, tokenizer, session, form),
    fields(login = %form.login)
)]
pub async fn login(
    pool: web::Data<DbPool>,
    tokenizer: web::Data<Tokenizer>,
    form: web::Json<LoginForm>,
    session: TypedSession
) -> Result<HttpResponse, LoginError>{
    let form = form.into_inner();
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let Some((user, has_account)) = find_user_for_login(conn, form.login.trim().to_string()).await? else {
        tracing::info!("No user registered under this login");
        return Err(LoginError::InvalidCredentials)
    };

    if !verify_password(form.password, user.password.clone()).await? {
        tracing::info!("Passwords did not match");
        return Err(LoginError::InvalidCredentials)
    }

    let kind = AccountKind::resolve(user.is_superuser, has_account);

    session.renew();
    session.insert_identity(user.user_id, kind)
        .context("Failed to insert identity into the session")?;

    let token = tokenizer.generate_key(&user, kind)
        .context("Failed to sign bearer token")?;

    Ok(HttpResponse::Ok().json(LoginResponse{
        token,
        account_kind: kind,
        user_id: user.user_id
    }))
}
