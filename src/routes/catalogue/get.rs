use std::{error::Error, fmt::Debug};

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use anyhow::Context;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    db_interaction::catalogue::{
        get_dish_detail, get_restaurant_detail, list_cities, list_dishes, list_restaurants, search,
        DishFilter, RestaurantFilter
    },
    routes::error_message,
    utils::{error_fmt_chain, get_pooled_connection, DbPool}
};

#[derive(Error)]
pub enum CatalogueError{
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Unexpected error occured")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for CatalogueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for CatalogueError {
    fn status_code(&self) -> StatusCode {
        match self {
            CatalogueError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogueError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        error_message(self.status_code(), self)
    }
}

#[tracing::instrument(
    "Getting cities",
    skip(pool)
)]
pub async fn get_cities(
    pool: web::Data<DbPool>
) -> Result<HttpResponse, CatalogueError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    Ok(HttpResponse::Ok().json(list_cities(conn).await?))
}

#[tracing::instrument(
    "Getting restaurants",
    skip(pool)
)]
pub async fn get_restaurants(
    pool: web::Data<DbPool>,
    filter: web::Query<RestaurantFilter>
) -> Result<HttpResponse, CatalogueError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    Ok(HttpResponse::Ok().json(list_restaurants(conn, filter.into_inner()).await?))
}

#[tracing::instrument(
    "Getting restaurant detail",
    skip(pool)
)]
pub async fn get_restaurant_by_id(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>
) -> Result<HttpResponse, CatalogueError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let detail = get_restaurant_detail(conn, path.into_inner())
        .await?
        .ok_or(CatalogueError::NotFound("Restaurant"))?;

    Ok(HttpResponse::Ok().json(detail))
}

#[tracing::instrument(
    "Getting dishes",
    skip(pool)
)]
pub async fn get_dishes(
    pool: web::Data<DbPool>,
    filter: web::Query<DishFilter>
) -> Result<HttpResponse, CatalogueError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    Ok(HttpResponse::Ok().json(list_dishes(conn, filter.into_inner()).await?))
}

#[tracing::instrument(
    "Getting dish detail",
    skip(pool)
)]
pub async fn get_dish_by_id(
    pool: web::Data<DbPool>,
    path: web::Path<Uuid>
) -> Result<HttpResponse, CatalogueError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let detail = get_dish_detail(conn, path.into_inner())
        .await?
        .ok_or(CatalogueError::NotFound("Dish"))?;

    Ok(HttpResponse::Ok().json(detail))
}

#[derive(Deserialize, Debug)]
pub struct SearchQuery{
    #[serde(default)]
    pub q: String
}

#[tracing::instrument(
    "Searching dishes and restaurants",
    skip(pool)
)]
pub async fn get_search(
    pool: web::Data<DbPool>,
    query: web::Query<SearchQuery>
) -> Result<HttpResponse, CatalogueError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    Ok(HttpResponse::Ok().json(search(conn, query.into_inner().q).await?))
}
