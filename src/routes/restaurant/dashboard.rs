use actix_web::{error::ErrorInternalServerError, web, HttpResponse};
use anyhow::Context;

use crate::{
    auth::extractors::RestaurantOwner,
    db_interaction::restaurants::{get_dashboard, DashboardFilter},
    utils::{get_pooled_connection, BusinessClock, DbPool}
};

#[tracing::instrument(
    "Loading dashboard of restaurant owner",
    skip(pool, clock, owner),
    fields(restaurant_id = %owner.restaurant_id())
)]
pub async fn get_restaurant_dashboard(
    pool: web::Data<DbPool>,
    clock: web::Data<BusinessClock>,
    owner: RestaurantOwner,
    filter: web::Query<DashboardFilter>
) -> Result<HttpResponse, actix_web::Error>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")
        .map_err(ErrorInternalServerError)?;

    let dashboard = get_dashboard(conn, owner.account, filter.into_inner(), clock.today())
        .await
        .map_err(ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(dashboard))
}
