use actix_web::{web, HttpResponse};
use anyhow::Context;
use serde::Deserialize;
use uuid::Uuid;

use super::OrderRouteError;
use crate::{
    auth::extractors::RestaurantOwner,
    db_interaction::orders::update_order_status,
    domain::order::OrderStatus,
    utils::{get_pooled_connection, DbPool}
};

#[derive(Deserialize, Debug)]
pub struct OrderStatusForm{
    pub status: OrderStatus
}

#[tracing::instrument(
    "Updating status of order",
    skip(pool, owner),
    fields(restaurant_id = %owner.restaurant_id())
)]
pub async fn update_status_of_order(
    pool: web::Data<DbPool>,
    owner: RestaurantOwner,
    path: web::Path<Uuid>,
    form: web::Json<OrderStatusForm>
) -> Result<HttpResponse, OrderRouteError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let order = update_order_status(conn, owner.restaurant_id(), path.into_inner(), form.status).await?;

    Ok(HttpResponse::Ok().json(order))
}
