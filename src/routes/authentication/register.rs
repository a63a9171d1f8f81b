use std::{error::Error, fmt::Debug};

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use anyhow::Context;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    db_interaction::user::{insert_user_into_database, NewUser, UserInsertError},
    domain::user_email::UserEmail,
    password::MIN_PASSWORD_LENGTH,
    routes::{error_message, field_errors},
    utils::{error_fmt_chain, get_pooled_connection, DbPool}
};

#[derive(Deserialize, Debug)]
pub struct SignupForm{
    username: String,
    email: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    password: SecretString,
    confirm_password: SecretString
}

impl SignupForm {
    fn validate(&self) -> Result<(), Vec<(&'static str, String)>>{
        let mut errors = Vec::new();

        if self.username.trim().is_empty() {
            errors.push(("username", "This field is required".to_string()));
        }
        if let Err(e) = UserEmail::parse(self.email.clone()) {
            errors.push(("email", e));
        }
        if self.password.expose_secret().len() < MIN_PASSWORD_LENGTH {
            errors.push(("password", format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH)));
        }
        if self.password.expose_secret() != self.confirm_password.expose_secret() {
            errors.push(("confirm_password", "the password and confirm passwords don't match".to_string()));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[derive(Error)]
pub enum SignupError{
    #[error("invalid signup form")]
    ValidationError(Vec<(&'static str, String)>),
    #[error("{0} is already taken")]
    UserAlreadyExists(&'static str),
    #[error("unexpected error occured")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for SignupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl From<UserInsertError> for SignupError {
    fn from(e: UserInsertError) -> Self {
        match e {
            UserInsertError::NotUnique(field) => SignupError::UserAlreadyExists(field),
            other => SignupError::UnexpectedError(other.into())
        }
    }
}

impl ResponseError for SignupError{
    fn status_code(&self) -> StatusCode {
        match self {
            SignupError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        match self {
            SignupError::ValidationError(errors) => field_errors(errors.iter().map(|(f, m)| (*f, m.clone()))),
            SignupError::UserAlreadyExists(field) => field_errors([(*field, self.to_string())]),
            SignupError::UnexpectedError(_) => error_message(self.status_code(), self)
        }
    }
}

#[tracing::instrument(
    "User signup started",
    skip(pool, form),
    fields(username = %form.username)
)]
pub async fn signup(
    form: web::Json<SignupForm>,
    pool: web::Data<DbPool>
) -> Result<HttpResponse, SignupError> {
    form.validate().map_err(SignupError::ValidationError)?;

    let form = form.into_inner();
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let user = insert_user_into_database(
        conn,
        NewUser{
            username: form.username.trim().to_string(),
            email: form.email.trim().to_string(),
            first_name: form.first_name.trim().to_string(),
            last_name: form.last_name.trim().to_string(),
            is_superuser: false
        },
        form.password
    )
    .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "user_id": user.user_id,
        "username": user.username
    })))
}
