use std::{error::Error, fmt::Debug};

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use anyhow::Context;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::extractors::CurrentUser,
    db_interaction::user::{post_user_profile_info, PostUserProfileInfoError, ProfileUpdate},
    domain::{phone_number::PhoneNumberDomain, user_email::UserEmail},
    routes::{error_message, field_errors},
    utils::{error_fmt_chain, get_pooled_connection, DbPool}
};

#[derive(Deserialize, Debug)]
pub struct ProfileForm{
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub is_vegetarian: Option<bool>,
    pub is_vegan: Option<bool>
}

#[derive(thiserror::Error)]
pub enum PostProfileError{
    #[error("invalid profile data")]
    InvalidData(Vec<(&'static str, String)>),
    #[error("{0} is already taken")]
    NotUnique(&'static str),
    #[error("No profile found for this user")]
    NotFound,
    #[error("Unexpected error occured")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for PostProfileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl From<PostUserProfileInfoError> for PostProfileError {
    fn from(e: PostUserProfileInfoError) -> Self {
        match e {
            PostUserProfileInfoError::NotUnique(field) => PostProfileError::NotUnique(field),
            PostUserProfileInfoError::NoSuchUser(_) => PostProfileError::NotFound,
            other => PostProfileError::UnexpectedError(other.into())
        }
    }
}

impl ResponseError for PostProfileError {
    fn status_code(&self) -> StatusCode {
        match self {
            PostProfileError::InvalidData(_) | PostProfileError::NotUnique(_) => StatusCode::BAD_REQUEST,
            PostProfileError::NotFound => StatusCode::NOT_FOUND,
            PostProfileError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        match self {
            PostProfileError::InvalidData(errors) => field_errors(errors.iter().map(|(f, m)| (*f, m.clone()))),
            PostProfileError::NotUnique(field) => field_errors([(*field, self.to_string())]),
            _ => error_message(self.status_code(), self)
        }
    }
}

// Validates the submitted fields, normalizing the phone number
fn into_update(form: ProfileForm) -> Result<ProfileUpdate, PostProfileError>{
    let mut errors = Vec::new();

    let email = match form.email {
        Some(email) => match UserEmail::parse(email) {
            Ok(email) => Some(email.inner()),
            Err(e) => { errors.push(("email", e)); None }
        },
        None => None
    };

    let phone = match form.phone {
        Some(phone) if phone.trim().is_empty() => Some(String::new()),
        Some(phone) => match PhoneNumberDomain::parse(phone) {
            Ok(phone) => Some(phone.inner()),
            Err(e) => { errors.push(("phone", e)); None }
        },
        None => None
    };

    if !errors.is_empty() {
        return Err(PostProfileError::InvalidData(errors))
    }

    Ok(ProfileUpdate{
        first_name: form.first_name,
        last_name: form.last_name,
        email,
        bio: form.bio,
        phone,
        // Vegan implies vegetarian
        is_vegetarian: if form.is_vegan == Some(true) { Some(true) } else { form.is_vegetarian },
        is_vegan: form.is_vegan
    })
}

#[tracing::instrument(
    "Posting user profile info",
    skip(pool, user, form),
    fields(user_id = %user.0.user_id)
)]
pub async fn post_profile(
    pool: web::Data<DbPool>,
    form: web::Json<ProfileForm>,
    user: CurrentUser
) -> Result<HttpResponse, PostProfileError>{
    let update = into_update(form.into_inner())?;

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let (user, profile) = post_user_profile_info(conn, update, user.0.user_id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "user": user,
        "profile": profile
    })))
}
