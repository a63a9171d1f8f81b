use std::{error::Error, fmt::Debug};

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use anyhow::Context;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use super::ReservationError;
use crate::{
    auth::extractors::{CurrentUser, RestaurantOwner},
    db_interaction::reservations::{
        cancel_reservation, modify_reservation, update_reservation_status, ReservationActionError, ReservationDetail
    },
    domain::reservation::{ReservationRequest, ReservationStatus},
    routes::error_message,
    utils::{error_fmt_chain, get_pooled_connection, BusinessClock, DbPool}
};

#[derive(Error)]
pub enum UpdateReservationError{
    #[error(transparent)]
    Action(#[from] ReservationActionError),
    #[error("Unexpected error occured")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for UpdateReservationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for UpdateReservationError {
    fn status_code(&self) -> StatusCode {
        match self {
            UpdateReservationError::Action(e) => match e {
                ReservationActionError::NotFound => StatusCode::NOT_FOUND,
                ReservationActionError::Forbidden => StatusCode::FORBIDDEN,
                ReservationActionError::NotCancellable
                    | ReservationActionError::InvalidTransition{ .. } => StatusCode::BAD_REQUEST,
                ReservationActionError::ThreadpoolError(_)
                    | ReservationActionError::RunQueryError(_) => StatusCode::INTERNAL_SERVER_ERROR
            },
            UpdateReservationError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        error_message(self.status_code(), self)
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct CancelForm{
    #[serde(default)]
    pub reason: Option<String>
}

#[tracing::instrument(
    "Cancelling reservation of logged in user",
    skip(pool, clock, user, form),
    fields(user_id = %user.0.user_id)
)]
pub async fn cancel_user_reservation(
    pool: web::Data<DbPool>,
    clock: web::Data<BusinessClock>,
    user: CurrentUser,
    path: web::Path<Uuid>,
    form: web::Json<CancelForm>
) -> Result<HttpResponse, UpdateReservationError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let now = clock.now();
    let reservation = cancel_reservation(
        conn,
        path.into_inner(),
        user.0.user_id,
        form.into_inner().reason.filter(|r| !r.trim().is_empty()),
        now
    )
    .await?;

    Ok(HttpResponse::Ok().json(ReservationDetail::new(reservation, now)))
}

#[tracing::instrument(
    "Modifying reservation of logged in user",
    skip(pool, clock, user, request),
    fields(user_id = %user.0.user_id)
)]
pub async fn modify_user_reservation(
    pool: web::Data<DbPool>,
    clock: web::Data<BusinessClock>,
    user: CurrentUser,
    path: web::Path<Uuid>,
    request: web::Json<ReservationRequest>
) -> Result<HttpResponse, ReservationError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let now = clock.now();
    let reservation = modify_reservation(conn, path.into_inner(), user.0.user_id, request.into_inner(), now).await?;

    Ok(HttpResponse::Ok().json(ReservationDetail::new(reservation, now)))
}

#[derive(Deserialize, Debug)]
pub struct StatusForm{
    pub status: ReservationStatus
}

#[tracing::instrument(
    "Owner updating reservation status",
    skip(pool, owner),
    fields(restaurant_id = %owner.restaurant_id())
)]
pub async fn update_status_of_reservation(
    pool: web::Data<DbPool>,
    owner: RestaurantOwner,
    path: web::Path<Uuid>,
    form: web::Json<StatusForm>
) -> Result<HttpResponse, UpdateReservationError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let reservation = update_reservation_status(conn, owner.restaurant_id(), path.into_inner(), form.status).await?;

    Ok(HttpResponse::Ok().json(reservation))
}
