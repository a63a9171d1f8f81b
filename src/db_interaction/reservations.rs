use std::{error::Error, fmt::Debug};

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use diesel::{dsl::sum, Connection, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    db_interaction::restaurants::holds_restaurant,
    domain::reservation::{
        append_cancel_reason, can_cancel, can_modify, fits_capacity, occupying_statuses, service_slots,
        ReservationRequest, ReservationStatus, ReservationValidationError, CONFIRMATION_CODE_LENGTH
    },
    models::Reservation,
    schema::{reservations, restaurants},
    telemetry::spawn_blocking_with_tracing,
    utils::{error_fmt_chain, generate_code, is_unique_violation, DbConnection}
};

/// Seats already held in a slot by pending and confirmed reservations,
/// leaving out `exclude` when a reservation is being moved.
pub fn booked_guests(
    conn: &mut DbConnection,
    restaurant_id: Uuid,
    date: NaiveDate,
    time: NaiveTime,
    exclude: Option<Uuid>
) -> diesel::QueryResult<i64>{
    let mut query = reservations::table
        .filter(reservations::restaurant_id.eq(restaurant_id))
        .filter(reservations::reservation_date.eq(date))
        .filter(reservations::reservation_time.eq(time))
        .filter(reservations::status.eq_any(occupying_statuses()))
        .select(sum(reservations::guests))
        .into_boxed();

    if let Some(reservation_id) = exclude {
        query = query.filter(reservations::reservation_id.ne(reservation_id));
    }

    Ok(query.first::<Option<i64>>(conn)?.unwrap_or(0))
}

pub fn is_slot_available(
    conn: &mut DbConnection,
    restaurant_id: Uuid,
    date: NaiveDate,
    time: NaiveTime,
    guests: i32,
    exclude: Option<Uuid>
) -> diesel::QueryResult<bool>{
    let capacity = restaurants::table
        .find(restaurant_id)
        .select(restaurants::capacity)
        .first::<i32>(conn)?;

    let existing = booked_guests(conn, restaurant_id, date, time, exclude)?;
    Ok(fits_capacity(existing, guests, capacity))
}

#[tracing::instrument(
    "Checking slot availability",
    skip(conn)
)]
pub async fn check_slot_availability(
    mut conn: DbConnection,
    restaurant_id: Uuid,
    date: NaiveDate,
    time: NaiveTime,
    guests: i32
) -> Result<Option<bool>, anyhow::Error>{
    spawn_blocking_with_tracing(move || {
        is_slot_available(&mut conn, restaurant_id, date, time, guests, None)
            .optional()
            .context("Failed to check slot availability")
    })
    .await
    .context("Failed due to threadpool error")?
}

#[derive(Serialize, Debug)]
pub struct SlotAvailability{
    pub time: NaiveTime,
    pub available: bool,
    pub remaining: i64
}

#[tracing::instrument(
    "Listing slot availability",
    skip(conn)
)]
pub async fn get_available_slots(
    mut conn: DbConnection,
    restaurant_id: Uuid,
    date: NaiveDate
) -> Result<Option<Vec<SlotAvailability>>, anyhow::Error>{
    spawn_blocking_with_tracing(move || -> Result<Option<Vec<SlotAvailability>>, anyhow::Error> {
        let capacity = restaurants::table
            .find(restaurant_id)
            .select(restaurants::capacity)
            .first::<i32>(&mut conn)
            .optional()
            .context("Failed to get restaurant capacity")?;

        let Some(capacity) = capacity else {
            return Ok(None)
        };

        let booked: Vec<(NaiveTime, Option<i64>)> = reservations::table
            .filter(reservations::restaurant_id.eq(restaurant_id))
            .filter(reservations::reservation_date.eq(date))
            .filter(reservations::status.eq_any(occupying_statuses()))
            .group_by(reservations::reservation_time)
            .select((reservations::reservation_time, sum(reservations::guests)))
            .load(&mut conn)
            .context("Failed to sum booked guests")?;

        let slots = service_slots()
            .into_iter()
            .map(|time| {
                let existing = booked.iter()
                    .find(|(t, _)| *t == time)
                    .and_then(|(_, s)| *s)
                    .unwrap_or(0);

                SlotAvailability{
                    time,
                    available: fits_capacity(existing, 1, capacity),
                    remaining: (capacity as i64 - existing).max(0)
                }
            })
            .collect();

        Ok(Some(slots))
    })
    .await
    .context("Failed due to threadpool error")?
}

// Error associated with booking or moving a reservation
#[derive(Error)]
pub enum BookingError{
    #[error("Tokio threadpool error occured")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("Failed to run query")]
    RunQueryError(#[source] diesel::result::Error),
    #[error("invalid reservation")]
    Invalid(Vec<ReservationValidationError>),
    #[error("restaurant not found")]
    RestaurantNotFound,
    #[error("reservation not found")]
    ReservationNotFound,
    #[error("reservation belongs to another user")]
    NotOwner,
    #[error("reservation can no longer be modified")]
    NotModifiable,
    #[error("Sorry, there is no more room for this time slot")]
    SlotFull,
    #[error("confirmation code already in use, please retry")]
    CodeCollision
}

impl From<diesel::result::Error> for BookingError {
    fn from(e: diesel::result::Error) -> Self {
        if is_unique_violation(&e) {
            BookingError::CodeCollision
        } else {
            BookingError::RunQueryError(e)
        }
    }
}

impl Debug for BookingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

// Locks the restaurant row so bookings on it are serialized
fn lock_restaurant(conn: &mut DbConnection, restaurant_id: Uuid) -> Result<i32, BookingError>{
    restaurants::table
        .find(restaurant_id)
        .select(restaurants::capacity)
        .for_update()
        .first::<i32>(conn)
        .optional()?
        .ok_or(BookingError::RestaurantNotFound)
}

/// Books a table. The capacity check and the insert run in one transaction
/// holding a lock on the restaurant row.
#[tracing::instrument(
    "Creating reservation",
    skip(conn, request),
    fields(date = %request.date, time = %request.time, guests = request.guests)
)]
pub async fn create_reservation(
    mut conn: DbConnection,
    restaurant_id: Uuid,
    user_id: Option<Uuid>,
    request: ReservationRequest,
    now: NaiveDateTime
) -> Result<Reservation, BookingError>{
    request.validate(now).map_err(BookingError::Invalid)?;

    let res = spawn_blocking_with_tracing(move || {
        conn.transaction::<Reservation, BookingError, _>(|conn| {
            let capacity = lock_restaurant(conn, restaurant_id)?;
            let existing = booked_guests(conn, restaurant_id, request.date, request.time, None)?;

            if !fits_capacity(existing, request.guests, capacity) {
                return Err(BookingError::SlotFull)
            }

            let reservation = Reservation{
                reservation_id: Uuid::new_v4(),
                restaurant_id,
                user_id,
                name: request.name.trim().to_string(),
                email: request.email.trim().to_string(),
                phone: request.phone.trim().to_string(),
                reservation_date: request.date,
                reservation_time: request.time,
                guests: request.guests,
                status: ReservationStatus::Pending.as_str().to_string(),
                notes: request.notes,
                confirmation_code: generate_code(CONFIRMATION_CODE_LENGTH),
                created_at: Utc::now(),
                updated_at: Utc::now()
            };

            diesel::insert_into(reservations::table)
                .values(&reservation)
                .execute(conn)?;

            Ok(reservation)
        })
    })
    .await??;

    Ok(res)
}

#[tracing::instrument(
    "Modifying reservation",
    skip(conn, request)
)]
pub async fn modify_reservation(
    mut conn: DbConnection,
    reservation_id: Uuid,
    user_id: Uuid,
    request: ReservationRequest,
    now: NaiveDateTime
) -> Result<Reservation, BookingError>{
    request.validate(now).map_err(BookingError::Invalid)?;

    let res = spawn_blocking_with_tracing(move || {
        conn.transaction::<Reservation, BookingError, _>(|conn| {
            let mut reservation = reservations::table
                .find(reservation_id)
                .select(Reservation::as_select())
                .first::<Reservation>(conn)
                .optional()?
                .ok_or(BookingError::ReservationNotFound)?;

            if reservation.user_id != Some(user_id) {
                return Err(BookingError::NotOwner)
            }

            let status = ReservationStatus::parse(&reservation.status)
                .ok_or(BookingError::NotModifiable)?;
            if !can_modify(status, reservation.reservation_date, reservation.reservation_time, now) {
                return Err(BookingError::NotModifiable)
            }

            let capacity = lock_restaurant(conn, reservation.restaurant_id)?;
            let existing = booked_guests(
                conn,
                reservation.restaurant_id,
                request.date,
                request.time,
                Some(reservation_id)
            )?;

            if !fits_capacity(existing, request.guests, capacity) {
                return Err(BookingError::SlotFull)
            }

            reservation.name = request.name.trim().to_string();
            reservation.email = request.email.trim().to_string();
            reservation.phone = request.phone.trim().to_string();
            reservation.reservation_date = request.date;
            reservation.reservation_time = request.time;
            reservation.guests = request.guests;
            reservation.notes = request.notes;
            reservation.updated_at = Utc::now();

            diesel::update(reservations::table.find(reservation_id))
                .set((
                    reservations::name.eq(&reservation.name),
                    reservations::email.eq(&reservation.email),
                    reservations::phone.eq(&reservation.phone),
                    reservations::reservation_date.eq(reservation.reservation_date),
                    reservations::reservation_time.eq(reservation.reservation_time),
                    reservations::guests.eq(reservation.guests),
                    reservations::notes.eq(&reservation.notes),
                    reservations::updated_at.eq(reservation.updated_at)
                ))
                .execute(conn)?;

            Ok(reservation)
        })
    })
    .await??;

    Ok(res)
}

#[tracing::instrument(
    "Listing reservations of user",
    skip(conn)
)]
pub async fn list_user_reservations(
    mut conn: DbConnection,
    user_id: Uuid,
    status: Option<ReservationStatus>
) -> Result<Vec<Reservation>, anyhow::Error>{
    spawn_blocking_with_tracing(move || {
        let mut query = reservations::table
            .filter(reservations::user_id.eq(user_id))
            .select(Reservation::as_select())
            .into_boxed();

        if let Some(status) = status {
            query = query.filter(reservations::status.eq(status.as_str()));
        }

        query
            .order((reservations::reservation_date.desc(), reservations::reservation_time.desc()))
            .load::<Reservation>(&mut conn)
            .context("Failed to load reservations")
    })
    .await
    .context("Failed due to threadpool error")?
}

// Errors of reading or acting on an existing reservation
#[derive(Error)]
pub enum ReservationActionError{
    #[error("Tokio threadpool error occured")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("Failed to run query")]
    RunQueryError(#[from] diesel::result::Error),
    #[error("reservation not found")]
    NotFound,
    #[error("not allowed to access this reservation")]
    Forbidden,
    #[error("This reservation cannot be cancelled")]
    NotCancellable,
    #[error("cannot move a reservation from {from} to {to}")]
    InvalidTransition{ from: String, to: &'static str }
}

impl Debug for ReservationActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

fn find_reservation(conn: &mut DbConnection, reservation_id: Uuid) -> Result<Reservation, ReservationActionError>{
    reservations::table
        .find(reservation_id)
        .select(Reservation::as_select())
        .first::<Reservation>(conn)
        .optional()?
        .ok_or(ReservationActionError::NotFound)
}

#[derive(Serialize)]
pub struct ReservationDetail{
    #[serde(flatten)]
    pub reservation: Reservation,
    pub can_cancel: bool,
    pub can_modify: bool
}

impl ReservationDetail {
    pub fn new(reservation: Reservation, now: NaiveDateTime) -> Self{
        let (cancel, modify) = match ReservationStatus::parse(&reservation.status) {
            Some(status) => (
                can_cancel(status, reservation.reservation_date, reservation.reservation_time, now),
                can_modify(status, reservation.reservation_date, reservation.reservation_time, now)
            ),
            None => (false, false)
        };

        Self{ reservation, can_cancel: cancel, can_modify: modify }
    }
}

/// A reservation is visible to the user who booked it and to the holder of
/// the restaurant's account.
#[tracing::instrument(
    "Getting reservation detail",
    skip(conn)
)]
pub async fn get_reservation_for_user(
    mut conn: DbConnection,
    reservation_id: Uuid,
    user_id: Uuid
) -> Result<Reservation, ReservationActionError>{
    spawn_blocking_with_tracing(move || {
        let reservation = find_reservation(&mut conn, reservation_id)?;

        if reservation.user_id == Some(user_id)
            || holds_restaurant(&mut conn, user_id, reservation.restaurant_id)?
        {
            Ok(reservation)
        } else {
            Err(ReservationActionError::Forbidden)
        }
    })
    .await?
}

#[tracing::instrument(
    "Cancelling reservation",
    skip(conn, reason)
)]
pub async fn cancel_reservation(
    mut conn: DbConnection,
    reservation_id: Uuid,
    user_id: Uuid,
    reason: Option<String>,
    now: NaiveDateTime
) -> Result<Reservation, ReservationActionError>{
    spawn_blocking_with_tracing(move || {
        conn.transaction::<Reservation, ReservationActionError, _>(|conn| {
            let mut reservation = find_reservation(conn, reservation_id)?;

            if reservation.user_id != Some(user_id) {
                return Err(ReservationActionError::Forbidden)
            }

            let cancellable = ReservationStatus::parse(&reservation.status)
                .map(|status| can_cancel(status, reservation.reservation_date, reservation.reservation_time, now))
                .unwrap_or(false);
            if !cancellable {
                return Err(ReservationActionError::NotCancellable)
            }

            reservation.status = ReservationStatus::Canceled.as_str().to_string();
            reservation.notes = append_cancel_reason(&reservation.notes, reason.as_deref());
            reservation.updated_at = Utc::now();

            diesel::update(reservations::table.find(reservation_id))
                .set((
                    reservations::status.eq(&reservation.status),
                    reservations::notes.eq(&reservation.notes),
                    reservations::updated_at.eq(reservation.updated_at)
                ))
                .execute(conn)?;

            Ok(reservation)
        })
    })
    .await?
}

/// Moves a reservation of the owner's restaurant along the forward-only
/// status graph.
#[tracing::instrument(
    "Updating reservation status",
    skip(conn)
)]
pub async fn update_reservation_status(
    mut conn: DbConnection,
    restaurant_id: Uuid,
    reservation_id: Uuid,
    next: ReservationStatus
) -> Result<Reservation, ReservationActionError>{
    spawn_blocking_with_tracing(move || {
        conn.transaction::<Reservation, ReservationActionError, _>(|conn| {
            let mut reservation = find_reservation(conn, reservation_id)?;

            if reservation.restaurant_id != restaurant_id {
                return Err(ReservationActionError::Forbidden)
            }

            let allowed = ReservationStatus::parse(&reservation.status)
                .map(|current| current.can_transition_to(next))
                .unwrap_or(false);
            if !allowed {
                return Err(ReservationActionError::InvalidTransition{
                    from: reservation.status.clone(),
                    to: next.as_str()
                })
            }

            reservation.status = next.as_str().to_string();
            reservation.updated_at = Utc::now();

            diesel::update(reservations::table.find(reservation_id))
                .set((
                    reservations::status.eq(&reservation.status),
                    reservations::updated_at.eq(reservation.updated_at)
                ))
                .execute(conn)?;

            Ok(reservation)
        })
    })
    .await?
}
