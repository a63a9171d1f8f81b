use std::{error::Error, fmt::Debug};

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use anyhow::Context;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    auth::extractors::MaybeUser,
    db_interaction::reservations::{create_reservation, BookingError},
    domain::reservation::ReservationRequest,
    email_client::EmailClient,
    models::Reservation,
    routes::{error_message, field_errors, NON_FIELD_ERRORS},
    utils::{error_fmt_chain, get_pooled_connection, BusinessClock, DbPool}
};

#[derive(Error)]
pub enum ReservationError{
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error("Unexpected error occured")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for ReservationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for ReservationError {
    fn status_code(&self) -> StatusCode {
        match self {
            ReservationError::Booking(e) => match e {
                BookingError::Invalid(_) | BookingError::SlotFull | BookingError::NotModifiable => StatusCode::BAD_REQUEST,
                BookingError::RestaurantNotFound | BookingError::ReservationNotFound => StatusCode::NOT_FOUND,
                BookingError::NotOwner => StatusCode::FORBIDDEN,
                BookingError::CodeCollision => StatusCode::CONFLICT,
                BookingError::ThreadpoolError(_) | BookingError::RunQueryError(_) => StatusCode::INTERNAL_SERVER_ERROR
            },
            ReservationError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        match self {
            ReservationError::Booking(BookingError::Invalid(errors)) => {
                field_errors(errors.iter().map(|e| (e.field(), e.to_string())))
            },
            ReservationError::Booking(e @ BookingError::SlotFull) => {
                field_errors([(NON_FIELD_ERRORS, e.to_string())])
            },
            _ => error_message(self.status_code(), self)
        }
    }
}

pub fn send_reservation_confirmation(email_client: &EmailClient, reservation: &Reservation){
    email_client.notify(
        &reservation.email,
        format!("Reservation {} received", reservation.confirmation_code),
        format!(
            "Hello {},\nWe received your reservation for {} guest(s) on {} at {}.\nYour confirmation code is {}.",
            reservation.name,
            reservation.guests,
            reservation.reservation_date,
            reservation.reservation_time.format("%H:%M"),
            reservation.confirmation_code
        )
    );
}

#[tracing::instrument(
    "Booking a table",
    skip(pool, email_client, clock, user, request)
)]
pub async fn make_reservation(
    pool: web::Data<DbPool>,
    email_client: web::Data<EmailClient>,
    clock: web::Data<BusinessClock>,
    path: web::Path<Uuid>,
    user: MaybeUser,
    request: web::Json<ReservationRequest>
) -> Result<HttpResponse, ReservationError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let reservation = create_reservation(
        conn,
        path.into_inner(),
        user.0.map(|identity| identity.user_id),
        request.into_inner(),
        clock.now()
    )
    .await?;

    tracing::info!(code = %reservation.confirmation_code, "Reservation created");
    send_reservation_confirmation(&email_client, &reservation);

    Ok(HttpResponse::Created().json(reservation))
}
