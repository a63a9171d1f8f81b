use std::{error::Error, fmt::Debug};

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use anyhow::Context;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    auth::extractors::CurrentUser,
    db_interaction::{
        reservations::{
            check_slot_availability, get_available_slots, get_reservation_for_user, list_user_reservations,
            ReservationActionError, ReservationDetail
        },
        restaurants::get_restaurant
    },
    domain::reservation::{bookable_dates, ReservationStatus},
    routes::error_message,
    utils::{error_fmt_chain, get_pooled_connection, BusinessClock, DbPool}
};

#[derive(Error)]
pub enum GetReservationError{
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Not allowed to access this reservation")]
    Forbidden,
    #[error("Unexpected error occured")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for GetReservationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl From<ReservationActionError> for GetReservationError {
    fn from(e: ReservationActionError) -> Self {
        match e {
            ReservationActionError::NotFound => GetReservationError::NotFound("Reservation"),
            ReservationActionError::Forbidden => GetReservationError::Forbidden,
            other => GetReservationError::UnexpectedError(other.into())
        }
    }
}

impl ResponseError for GetReservationError {
    fn status_code(&self) -> StatusCode {
        match self {
            GetReservationError::NotFound(_) => StatusCode::NOT_FOUND,
            GetReservationError::Forbidden => StatusCode::FORBIDDEN,
            GetReservationError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        error_message(self.status_code(), self)
    }
}

#[derive(Deserialize, Debug)]
pub struct SlotsQuery{
    pub date: NaiveDate
}

#[tracing::instrument(
    "Getting available time slots",
    skip(pool)
)]
pub async fn get_slots(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    query: web::Query<SlotsQuery>
) -> Result<HttpResponse, GetReservationError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let date = query.date;
    let slots = get_available_slots(conn, path.into_inner(), date)
        .await?
        .ok_or(GetReservationError::NotFound("Restaurant"))?;

    Ok(HttpResponse::Ok().json(json!({
        "date": date,
        "slots": slots
    })))
}

#[tracing::instrument(
    "Getting bookable dates",
    skip(pool, clock)
)]
pub async fn get_dates(
    pool: web::Data<DbPool>,
    clock: web::Data<BusinessClock>,
    path: web::Path<Uuid>
) -> Result<HttpResponse, GetReservationError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    get_restaurant(conn, path.into_inner())
        .await?
        .ok_or(GetReservationError::NotFound("Restaurant"))?;

    Ok(HttpResponse::Ok().json(json!({
        "dates": bookable_dates(clock.today())
    })))
}

#[derive(Deserialize, Debug)]
pub struct AvailabilityQuery{
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub guests: i32
}

#[tracing::instrument(
    "Checking availability of a slot",
    skip(pool)
)]
pub async fn get_availability(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>,
    query: web::Query<AvailabilityQuery>
) -> Result<HttpResponse, GetReservationError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let query = query.into_inner();
    let available = check_slot_availability(conn, path.into_inner(), query.date, query.time, query.guests)
        .await?
        .ok_or(GetReservationError::NotFound("Restaurant"))?;

    Ok(HttpResponse::Ok().json(json!({ "available": available })))
}

#[derive(Deserialize, Debug)]
pub struct ReservationListQuery{
    pub status: Option<ReservationStatus>
}

#[tracing::instrument(
    "Listing reservations of logged in user",
    skip(pool, clock, user),
    fields(user_id = %user.0.user_id)
)]
pub async fn get_user_reservations(
    pool: web::Data<DbPool>,
    clock: web::Data<BusinessClock>,
    user: CurrentUser,
    query: web::Query<ReservationListQuery>
) -> Result<HttpResponse, GetReservationError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let now = clock.now();
    let reservations: Vec<ReservationDetail> = list_user_reservations(conn, user.0.user_id, query.status)
        .await?
        .into_iter()
        .map(|reservation| ReservationDetail::new(reservation, now))
        .collect();

    Ok(HttpResponse::Ok().json(reservations))
}

#[tracing::instrument(
    "Getting reservation of logged in user",
    skip(pool, clock, user),
    fields(user_id = %user.0.user_id)
)]
pub async fn get_user_reservation(
    pool: web::Data<DbPool>,
    clock: web::Data<BusinessClock>,
    user: CurrentUser,
    path: web::Path<Uuid>
) -> Result<HttpResponse, GetReservationError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let reservation = get_reservation_for_user(conn, path.into_inner(), user.0.user_id).await?;

    Ok(HttpResponse::Ok().json(ReservationDetail::new(reservation, clock.now())))
}
