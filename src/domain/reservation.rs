use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{phone_number::PhoneNumberDomain, user_email::UserEmail};

pub const MIN_GUESTS: i32 = 1;
pub const MAX_GUESTS: i32 = 20;
pub const BOOKING_HORIZON_DAYS: i64 = 90;
pub const BOOKABLE_DATES_AHEAD: i64 = 30;
pub const SLOT_STEP_MINUTES: u32 = 30;
pub const CONFIRMATION_CODE_LENGTH: usize = 6;
pub const DEFAULT_CAPACITY: i32 = 50;

// Lunch and dinner services, minutes from midnight, both bounds bookable
pub const SERVICE_WINDOWS: [(u32, u32); 2] = [
    (12 * 60, 14 * 60 + 30),
    (19 * 60, 22 * 60 + 30)
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus{
    Pending,
    Confirmed,
    Canceled,
    Completed
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str{
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Canceled => "canceled",
            ReservationStatus::Completed => "completed"
        }
    }

    pub fn parse(value: &str) -> Option<Self>{
        match value {
            "pending" => Some(ReservationStatus::Pending),
            "confirmed" => Some(ReservationStatus::Confirmed),
            "canceled" => Some(ReservationStatus::Canceled),
            "completed" => Some(ReservationStatus::Completed),
            _ => None
        }
    }

    pub fn is_terminal(&self) -> bool{
        matches!(self, ReservationStatus::Canceled | ReservationStatus::Completed)
    }

    // Statuses that hold seats in a slot
    pub fn occupies_slot(&self) -> bool{
        matches!(self, ReservationStatus::Pending | ReservationStatus::Confirmed)
    }

    pub fn can_transition_to(&self, next: ReservationStatus) -> bool{
        use ReservationStatus::*;

        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Canceled) | (Pending, Completed)
                | (Confirmed, Completed) | (Confirmed, Canceled)
        )
    }
}

pub fn occupying_statuses() -> [&'static str; 2]{
    [ReservationStatus::Pending.as_str(), ReservationStatus::Confirmed.as_str()]
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReservationValidationError{
    #[error("You cannot book a date in the past")]
    DateInPast,
    #[error("Reservations are limited to 90 days in advance")]
    DateTooFar,
    #[error("You cannot book a time that has already passed")]
    TimeInPast,
    #[error("Please choose a time during service: 12:00-14:30 or 19:00-22:30")]
    OutsideServiceHours,
    #[error("Number of guests must be at least 1")]
    TooFewGuests,
    #[error("For groups larger than 20 please contact the restaurant directly")]
    TooManyGuests,
    #[error("Name is required")]
    MissingName,
    #[error("{0}")]
    InvalidEmail(String),
    #[error("{0}")]
    InvalidPhone(String)
}

impl ReservationValidationError {
    pub fn field(&self) -> &'static str{
        match self {
            Self::DateInPast | Self::DateTooFar => "date",
            Self::TimeInPast | Self::OutsideServiceHours => "time",
            Self::TooFewGuests | Self::TooManyGuests => "guests",
            Self::MissingName => "name",
            Self::InvalidEmail(_) => "email",
            Self::InvalidPhone(_) => "phone"
        }
    }
}

// What a guest submits when booking or modifying a reservation
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationRequest{
    pub name: String,
    pub email: String,
    pub phone: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub guests: i32,
    #[serde(default)]
    pub notes: String
}

impl ReservationRequest {
    /// Checks every field against the booking rules at instant `now`
    /// (local business time) and reports all failures at once.
    pub fn validate(&self, now: NaiveDateTime) -> Result<(), Vec<ReservationValidationError>>{
        let mut errors = Vec::new();

        if let Err(e) = validate_date(self.date, now.date()) {
            errors.push(e);
        }
        if let Err(e) = validate_time(self.date, self.time, now) {
            errors.push(e);
        }
        if let Err(e) = validate_guests(self.guests) {
            errors.push(e);
        }
        if self.name.trim().is_empty() {
            errors.push(ReservationValidationError::MissingName);
        }
        if let Err(e) = UserEmail::parse(self.email.clone()) {
            errors.push(ReservationValidationError::InvalidEmail(e));
        }
        if let Err(e) = PhoneNumberDomain::parse(self.phone.clone()) {
            errors.push(ReservationValidationError::InvalidPhone(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

pub fn validate_date(date: NaiveDate, today: NaiveDate) -> Result<(), ReservationValidationError>{
    if date < today {
        return Err(ReservationValidationError::DateInPast)
    }

    if date > today + Duration::days(BOOKING_HORIZON_DAYS) {
        return Err(ReservationValidationError::DateTooFar)
    }

    Ok(())
}

pub fn validate_time(date: NaiveDate, time: NaiveTime, now: NaiveDateTime) -> Result<(), ReservationValidationError>{
    if date == now.date() && time < now.time() {
        return Err(ReservationValidationError::TimeInPast)
    }

    if !within_service_hours(time) {
        return Err(ReservationValidationError::OutsideServiceHours)
    }

    Ok(())
}

pub fn validate_guests(guests: i32) -> Result<(), ReservationValidationError>{
    if guests < MIN_GUESTS {
        Err(ReservationValidationError::TooFewGuests)
    } else if guests > MAX_GUESTS {
        Err(ReservationValidationError::TooManyGuests)
    } else {
        Ok(())
    }
}

pub fn within_service_hours(time: NaiveTime) -> bool{
    let seconds = time.num_seconds_from_midnight();

    SERVICE_WINDOWS.iter().any(|(start, end)| {
        seconds >= start * 60 && seconds <= end * 60
    })
}

/// Whether a party of `guests` still fits when `existing_guests` seats are
/// already held in the slot.
pub fn fits_capacity(existing_guests: i64, guests: i32, capacity: i32) -> bool{
    if capacity <= 0 {
        return false
    }

    existing_guests + guests as i64 <= capacity as i64
}

// Half-hour starts inside each service window, window end excluded
pub fn service_slots() -> Vec<NaiveTime>{
    SERVICE_WINDOWS.iter()
        .flat_map(|(start, end)| {
            (*start..*end)
                .step_by(SLOT_STEP_MINUTES as usize)
                .filter_map(|minute| NaiveTime::from_num_seconds_from_midnight_opt(minute * 60, 0))
        })
        .collect()
}

// Bookable dates from today on, restaurants are closed on Mondays
pub fn bookable_dates(today: NaiveDate) -> Vec<NaiveDate>{
    (0..BOOKABLE_DATES_AHEAD)
        .map(|offset| today + Duration::days(offset))
        .filter(|date| date.weekday() != Weekday::Mon)
        .collect()
}

pub fn starts_at(date: NaiveDate, time: NaiveTime) -> NaiveDateTime{
    date.and_time(time)
}

pub fn is_past(date: NaiveDate, time: NaiveTime, now: NaiveDateTime) -> bool{
    starts_at(date, time) < now
}

pub fn can_cancel(status: ReservationStatus, date: NaiveDate, time: NaiveTime, now: NaiveDateTime) -> bool{
    !is_past(date, time, now) && !status.is_terminal()
}

pub fn can_modify(status: ReservationStatus, date: NaiveDate, time: NaiveTime, now: NaiveDateTime) -> bool{
    can_cancel(status, date, time, now)
        && starts_at(date, time) - now > Duration::hours(24)
}

// Cancellation reasons are appended to whatever notes the guest left
pub fn append_cancel_reason(notes: &str, reason: Option<&str>) -> String{
    match reason.map(str::trim).filter(|r| !r.is_empty()) {
        Some(reason) if notes.trim().is_empty() => format!("Cancellation reason: {}", reason),
        Some(reason) => format!("{}\n\nCancellation reason: {}", notes, reason),
        None => notes.to_string()
    }
}
