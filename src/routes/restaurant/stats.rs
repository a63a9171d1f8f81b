use actix_web::{error::ErrorInternalServerError, web, HttpResponse};
use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    auth::extractors::RestaurantOwner,
    db_interaction::statistics::get_statistics,
    domain::statistics::resolve_range,
    routes::field_errors,
    utils::{get_pooled_connection, BusinessClock, DbPool}
};

#[derive(Deserialize, Debug)]
pub struct StatsQuery{
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>
}

#[tracing::instrument(
    "Getting restaurant statistics",
    skip(pool, clock, owner),
    fields(restaurant_id = %owner.restaurant_id())
)]
pub async fn get_restaurant_stats(
    pool: web::Data<DbPool>,
    clock: web::Data<BusinessClock>,
    owner: RestaurantOwner,
    query: web::Query<StatsQuery>
) -> Result<HttpResponse, actix_web::Error>{
    let clock = *clock.get_ref();
    let (start, end) = match resolve_range(query.from, query.to, clock.today()) {
        Ok(range) => range,
        Err(e) => return Ok(field_errors([("from", e.to_string())]))
    };

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")
        .map_err(ErrorInternalServerError)?;

    let report = get_statistics(conn, owner.restaurant_id(), start, end, clock)
        .await
        .map_err(ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(report))
}
