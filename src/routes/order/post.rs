use std::{error::Error, fmt::Debug};

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use anyhow::Context;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    auth::extractors::RestaurantOwner,
    db_interaction::orders::{add_order_item, create_order, CreateOrderForm, OrderError, OrderLineForm},
    routes::{error_message, field_errors},
    utils::{error_fmt_chain, get_pooled_connection, DbPool}
};

#[derive(Error)]
pub enum OrderRouteError{
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error("Unexpected error occured")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for OrderRouteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for OrderRouteError {
    fn status_code(&self) -> StatusCode {
        match self {
            OrderRouteError::Order(e) => match e {
                OrderError::OrderNotFound | OrderError::ItemNotFound => StatusCode::NOT_FOUND,
                OrderError::UnknownDish(_)
                    | OrderError::UnknownReservation(_)
                    | OrderError::EmptyOrder
                    | OrderError::InvalidQuantity(_)
                    | OrderError::StatusRejected(_) => StatusCode::BAD_REQUEST,
                OrderError::CodeCollision => StatusCode::CONFLICT,
                OrderError::ThreadpoolError(_) | OrderError::RunQueryError(_) => StatusCode::INTERNAL_SERVER_ERROR
            },
            OrderRouteError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        match self {
            OrderRouteError::Order(e @ (OrderError::EmptyOrder | OrderError::UnknownDish(_))) => {
                field_errors([("items", e.to_string())])
            },
            OrderRouteError::Order(e @ OrderError::InvalidQuantity(_)) => {
                field_errors([("quantity", e.to_string())])
            },
            OrderRouteError::Order(e @ OrderError::UnknownReservation(_)) => {
                field_errors([("reservation_id", e.to_string())])
            },
            _ => error_message(self.status_code(), self)
        }
    }
}

#[tracing::instrument(
    "Taking new order",
    skip(pool, owner, form),
    fields(restaurant_id = %owner.restaurant_id())
)]
pub async fn post_order(
    pool: web::Data<DbPool>,
    owner: RestaurantOwner,
    form: web::Json<CreateOrderForm>
) -> Result<HttpResponse, OrderRouteError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let order = create_order(conn, owner.restaurant_id(), form.into_inner()).await?;
    tracing::info!(order_code = %order.order.order_code, total = order.order.total_amount, "Order created");

    Ok(HttpResponse::Created().json(order))
}

#[tracing::instrument(
    "Adding item to existing order",
    skip(pool, owner, line),
    fields(restaurant_id = %owner.restaurant_id())
)]
pub async fn post_order_item(
    pool: web::Data<DbPool>,
    owner: RestaurantOwner,
    path: web::Path<Uuid>,
    line: web::Json<OrderLineForm>
) -> Result<HttpResponse, OrderRouteError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let order = add_order_item(conn, owner.restaurant_id(), path.into_inner(), line.into_inner()).await?;

    Ok(HttpResponse::Ok().json(order))
}
