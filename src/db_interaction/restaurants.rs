use std::{error::Error, fmt::Debug};

use anyhow::Context;
use chrono::NaiveDate;
use diesel::{dsl::count_star, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    domain::{order::OrderStatus, reservation::ReservationStatus},
    models::{Order, Reservation, Restaurant, RestaurantAccount},
    schema::{orders, reservations, restaurant_accounts, restaurants},
    telemetry::spawn_blocking_with_tracing,
    utils::{error_fmt_chain, DbConnection}
};

// Account of a user, only while it is allowed to run its restaurant
#[tracing::instrument(
    "Getting active restaurant account",
    skip(conn)
)]
pub async fn get_active_account_for_user(
    mut conn: DbConnection,
    user_id: Uuid
) -> Result<Option<RestaurantAccount>, anyhow::Error>{
    spawn_blocking_with_tracing(move || {
        restaurant_accounts::table
            .filter(restaurant_accounts::user_id.eq(user_id))
            .filter(restaurant_accounts::is_active.eq(true))
            .select(RestaurantAccount::as_select())
            .first::<RestaurantAccount>(&mut conn)
            .optional()
            .context("Failed to get restaurant account")
    })
    .await
    .context("Failed due to threadpool error")?
}

// Whether `user_id` holds the account of `restaurant_id`
pub fn holds_restaurant(conn: &mut DbConnection, user_id: Uuid, restaurant_id: Uuid) -> diesel::QueryResult<bool>{
    diesel::select(diesel::dsl::exists(
        restaurant_accounts::table
            .filter(restaurant_accounts::user_id.eq(user_id))
            .filter(restaurant_accounts::restaurant_id.eq(restaurant_id))
    ))
    .get_result::<bool>(conn)
}

#[tracing::instrument(
    "Getting restaurant",
    skip(conn)
)]
pub async fn get_restaurant(
    mut conn: DbConnection,
    restaurant_id: Uuid
) -> Result<Option<Restaurant>, anyhow::Error>{
    spawn_blocking_with_tracing(move || {
        restaurants::table
            .find(restaurant_id)
            .select(Restaurant::as_select())
            .first::<Restaurant>(&mut conn)
            .optional()
            .context("Failed to get restaurant")
    })
    .await
    .context("Failed due to threadpool error")?
}

#[derive(Deserialize, Debug, Default)]
pub struct DashboardFilter{
    pub status: Option<String>,
    pub date: Option<NaiveDate>
}

#[derive(Serialize)]
pub struct ReservationCounts{
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub canceled: i64
}

#[derive(Serialize)]
pub struct Dashboard{
    pub restaurant: Restaurant,
    pub account: RestaurantAccount,
    pub reservations: Vec<Reservation>,
    pub today_reservations: Vec<Reservation>,
    pub counts: ReservationCounts,
    pub recent_orders: Vec<Order>
}

#[tracing::instrument(
    "Loading restaurant dashboard",
    skip(conn, account)
)]
pub async fn get_dashboard(
    mut conn: DbConnection,
    account: RestaurantAccount,
    filter: DashboardFilter,
    today: NaiveDate
) -> Result<Dashboard, anyhow::Error>{
    spawn_blocking_with_tracing(move || -> Result<Dashboard, anyhow::Error> {
        let restaurant_id = account.restaurant_id;

        let restaurant = restaurants::table
            .find(restaurant_id)
            .select(Restaurant::as_select())
            .first::<Restaurant>(&mut conn)
            .context("Failed to get restaurant")?;

        let mut query = reservations::table
            .filter(reservations::restaurant_id.eq(restaurant_id))
            .select(Reservation::as_select())
            .into_boxed();
        if let Some(status) = filter.status.as_deref() {
            query = query.filter(reservations::status.eq(status.to_string()));
        }
        if let Some(date) = filter.date {
            query = query.filter(reservations::reservation_date.eq(date));
        }
        let listed = query
            .order((reservations::reservation_date.desc(), reservations::reservation_time.desc()))
            .load::<Reservation>(&mut conn)
            .context("Failed to load reservations")?;

        let today_reservations = reservations::table
            .filter(reservations::restaurant_id.eq(restaurant_id))
            .filter(reservations::reservation_date.eq(today))
            .order(reservations::reservation_time.asc())
            .select(Reservation::as_select())
            .load::<Reservation>(&mut conn)
            .context("Failed to load today's reservations")?;

        let by_status: Vec<(String, i64)> = reservations::table
            .filter(reservations::restaurant_id.eq(restaurant_id))
            .group_by(reservations::status)
            .select((reservations::status, count_star()))
            .load(&mut conn)
            .context("Failed to count reservations")?;
        let count_of = |status: ReservationStatus| by_status.iter()
            .find(|(s, _)| s == status.as_str())
            .map(|(_, n)| *n)
            .unwrap_or(0);

        let recent_orders = orders::table
            .filter(orders::restaurant_id.eq(restaurant_id))
            .filter(orders::status.eq_any([
                OrderStatus::New.as_str(),
                OrderStatus::Preparing.as_str(),
                OrderStatus::Ready.as_str()
            ]))
            .order(orders::order_time.desc())
            .limit(5)
            .select(Order::as_select())
            .load::<Order>(&mut conn)
            .context("Failed to load recent orders")?;

        Ok(Dashboard{
            restaurant,
            counts: ReservationCounts{
                total: by_status.iter().map(|(_, n)| n).sum(),
                pending: count_of(ReservationStatus::Pending),
                confirmed: count_of(ReservationStatus::Confirmed),
                canceled: count_of(ReservationStatus::Canceled)
            },
            account,
            reservations: listed,
            today_reservations,
            recent_orders
        })
    })
    .await
    .context("Failed due to threadpool error")?
}

#[derive(Deserialize, Debug)]
pub struct RestaurantInfoForm{
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub capacity: Option<i32>,
    pub is_open: Option<bool>
}

#[derive(Error)]
pub enum UpdateRestaurantError{
    #[error("Tokio threadpool error occured")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("Failed to run query")]
    RunQueryError(#[from] diesel::result::Error),
    #[error("capacity cannot be negative")]
    NegativeCapacity
}

impl Debug for UpdateRestaurantError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

#[tracing::instrument(
    "Updating restaurant info",
    skip(conn, form)
)]
pub async fn update_restaurant_info(
    mut conn: DbConnection,
    restaurant_id: Uuid,
    form: RestaurantInfoForm
) -> Result<Restaurant, UpdateRestaurantError>{
    if form.capacity.map(|c| c < 0).unwrap_or(false) {
        return Err(UpdateRestaurantError::NegativeCapacity)
    }

    let res = spawn_blocking_with_tracing(move || {
        let mut restaurant = restaurants::table
            .find(restaurant_id)
            .select(Restaurant::as_select())
            .first::<Restaurant>(&mut conn)?;

        if let Some(v) = form.name { restaurant.name = v; }
        if let Some(v) = form.address { restaurant.address = v; }
        if let Some(v) = form.phone { restaurant.phone = v; }
        if let Some(v) = form.email { restaurant.email = v; }
        if let Some(v) = form.website { restaurant.website = v; }
        if let Some(v) = form.description { restaurant.description = v; }
        if let Some(v) = form.capacity { restaurant.capacity = v; }
        if let Some(v) = form.is_open { restaurant.is_open = v; }

        diesel::update(restaurants::table.find(restaurant_id))
            .set((
                restaurants::name.eq(&restaurant.name),
                restaurants::address.eq(&restaurant.address),
                restaurants::phone.eq(&restaurant.phone),
                restaurants::email.eq(&restaurant.email),
                restaurants::website.eq(&restaurant.website),
                restaurants::description.eq(&restaurant.description),
                restaurants::capacity.eq(restaurant.capacity),
                restaurants::is_open.eq(restaurant.is_open)
            ))
            .execute(&mut conn)?;

        Ok::<_, diesel::result::Error>(restaurant)
    })
    .await??;

    Ok(res)
}
