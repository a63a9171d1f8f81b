use actix_web::{web, HttpResponse};
use anyhow::Context;
use uuid::Uuid;

use super::OrderRouteError;
use crate::{
    auth::extractors::RestaurantOwner,
    db_interaction::orders::remove_order_item,
    utils::{get_pooled_connection, DbPool}
};

#[tracing::instrument(
    "Removing item from order",
    skip(pool, owner),
    fields(restaurant_id = %owner.restaurant_id())
)]
pub async fn delete_order_item(
    pool: web::Data<DbPool>,
    owner: RestaurantOwner,
    path: web::Path<(Uuid, Uuid)>
) -> Result<HttpResponse, OrderRouteError>{
    let (order_id, order_item_id) = path.into_inner();
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let order = remove_order_item(conn, owner.restaurant_id(), order_id, order_item_id).await?;

    Ok(HttpResponse::Ok().json(order))
}
