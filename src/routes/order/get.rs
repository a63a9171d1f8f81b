use actix_web::{error::{ErrorInternalServerError, ErrorNotFound}, web, HttpResponse};
use anyhow::Context;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::extractors::RestaurantOwner,
    db_interaction::orders::{get_kitchen_board, get_order_detail, list_orders},
    domain::order::OrderStatus,
    utils::{get_pooled_connection, BusinessClock, DbPool}
};

#[derive(Deserialize, Debug)]
pub struct OrderListQuery{
    pub status: Option<OrderStatus>
}

#[tracing::instrument(
    "Listing orders",
    skip(pool, owner),
    fields(restaurant_id = %owner.restaurant_id())
)]
pub async fn get_orders(
    pool: web::Data<DbPool>,
    owner: RestaurantOwner,
    query: web::Query<OrderListQuery>
) -> Result<HttpResponse, actix_web::Error>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")
        .map_err(ErrorInternalServerError)?;

    let orders = list_orders(conn, owner.restaurant_id(), query.status)
        .await
        .map_err(ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(orders))
}

#[tracing::instrument(
    "Getting order by id",
    skip(pool, owner),
    fields(restaurant_id = %owner.restaurant_id())
)]
pub async fn get_order(
    pool: web::Data<DbPool>,
    owner: RestaurantOwner,
    path: web::Path<Uuid>
) -> Result<HttpResponse, actix_web::Error>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")
        .map_err(ErrorInternalServerError)?;

    match get_order_detail(conn, owner.restaurant_id(), path.into_inner())
        .await
        .map_err(ErrorInternalServerError)?
    {
        Some(order) => Ok(HttpResponse::Ok().json(order)),
        None => Err(ErrorNotFound("Order not found"))
    }
}

#[tracing::instrument(
    "Loading kitchen board",
    skip(pool, clock, owner),
    fields(restaurant_id = %owner.restaurant_id())
)]
pub async fn get_kitchen(
    pool: web::Data<DbPool>,
    clock: web::Data<BusinessClock>,
    owner: RestaurantOwner
) -> Result<HttpResponse, actix_web::Error>{
    let (day_start, day_end) = clock.day_bounds(clock.today());

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")
        .map_err(ErrorInternalServerError)?;

    let board = get_kitchen_board(conn, owner.restaurant_id(), day_start, day_end)
        .await
        .map_err(ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(board))
}
