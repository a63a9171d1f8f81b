use std::{error::Error, fmt::Debug};

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use anyhow::Context;
use thiserror::Error;

use crate::{
    auth::extractors::RestaurantOwner,
    cache::{CacheKey, ResponseCache},
    db_interaction::restaurants::{update_restaurant_info, RestaurantInfoForm, UpdateRestaurantError},
    domain::{phone_number::PhoneNumberDomain, user_email::UserEmail},
    routes::{error_message, field_errors},
    utils::{error_fmt_chain, get_pooled_connection, DbPool}
};

#[derive(Error)]
pub enum EditRestaurantError{
    #[error("invalid restaurant info")]
    ValidationError(Vec<(&'static str, String)>),
    #[error("Unexpected error occured")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for EditRestaurantError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl From<UpdateRestaurantError> for EditRestaurantError {
    fn from(e: UpdateRestaurantError) -> Self {
        match e {
            UpdateRestaurantError::NegativeCapacity => {
                EditRestaurantError::ValidationError(vec![("capacity", e.to_string())])
            },
            other => EditRestaurantError::UnexpectedError(other.into())
        }
    }
}

impl ResponseError for EditRestaurantError {
    fn status_code(&self) -> StatusCode {
        match self {
            EditRestaurantError::ValidationError(_) => StatusCode::BAD_REQUEST,
            EditRestaurantError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        match self {
            EditRestaurantError::ValidationError(errors) => field_errors(errors.iter().map(|(f, m)| (*f, m.clone()))),
            _ => error_message(self.status_code(), self)
        }
    }
}

fn validate(form: &RestaurantInfoForm) -> Result<(), EditRestaurantError>{
    let mut errors = Vec::new();

    if form.name.as_deref().map(|n| n.trim().is_empty()).unwrap_or(false) {
        errors.push(("name", "This field is required".to_string()));
    }
    if let Some(Err(e)) = form.email.clone().map(UserEmail::parse) {
        errors.push(("email", e));
    }
    if let Some(Err(e)) = form.phone.clone().map(PhoneNumberDomain::parse) {
        errors.push(("phone", e));
    }

    if errors.is_empty() { Ok(()) } else { Err(EditRestaurantError::ValidationError(errors)) }
}

#[tracing::instrument(
    "Editing restaurant info",
    skip(pool, cache, owner, form),
    fields(restaurant_id = %owner.restaurant_id())
)]
pub async fn edit_restaurant(
    pool: web::Data<DbPool>,
    cache: web::Data<ResponseCache>,
    owner: RestaurantOwner,
    form: web::Json<RestaurantInfoForm>
) -> Result<HttpResponse, EditRestaurantError>{
    validate(&form)?;

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let restaurant = update_restaurant_info(conn, owner.restaurant_id(), form.into_inner()).await?;
    cache.invalidate(CacheKey::AllRestaurants).await;

    Ok(HttpResponse::Ok().json(restaurant))
}
