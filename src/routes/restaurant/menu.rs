use std::{error::Error, fmt::Debug};

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use anyhow::Context;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    auth::extractors::RestaurantOwner,
    cache::{CacheKey, ResponseCache},
    db_interaction::menu::{
        create_category, create_dish, delete_category, delete_dish, get_menu, update_category, update_dish,
        CategoryForm, DishForm, MenuError
    },
    routes::{error_message, field_errors},
    utils::{error_fmt_chain, get_pooled_connection, DbPool}
};

#[derive(Error)]
pub enum MenuRouteError{
    #[error(transparent)]
    Menu(#[from] MenuError),
    #[error("Unexpected error occured")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for MenuRouteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for MenuRouteError {
    fn status_code(&self) -> StatusCode {
        match self {
            MenuRouteError::Menu(e) => match e {
                MenuError::NotFound(_) => StatusCode::NOT_FOUND,
                MenuError::NotOwner(_) => StatusCode::FORBIDDEN,
                MenuError::Invalid{ .. } => StatusCode::BAD_REQUEST,
                MenuError::ThreadpoolError(_) | MenuError::RunQueryError(_) => StatusCode::INTERNAL_SERVER_ERROR
            },
            MenuRouteError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        match self {
            MenuRouteError::Menu(MenuError::Invalid{ field, message }) => field_errors([(*field, message.clone())]),
            _ => error_message(self.status_code(), self)
        }
    }
}

#[tracing::instrument(
    "Getting menu of owned restaurant",
    skip(pool, owner),
    fields(restaurant_id = %owner.restaurant_id())
)]
pub async fn get_owner_menu(
    pool: web::Data<DbPool>,
    owner: RestaurantOwner
) -> Result<HttpResponse, MenuRouteError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    Ok(HttpResponse::Ok().json(get_menu(conn, owner.restaurant_id()).await?))
}

#[tracing::instrument(
    "Adding category",
    skip(pool, owner),
    fields(restaurant_id = %owner.restaurant_id())
)]
pub async fn post_category(
    pool: web::Data<DbPool>,
    owner: RestaurantOwner,
    form: web::Json<CategoryForm>
) -> Result<HttpResponse, MenuRouteError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let category = create_category(conn, owner.restaurant_id(), form.into_inner()).await?;

    Ok(HttpResponse::Created().json(category))
}

#[tracing::instrument(
    "Editing category",
    skip(pool, owner),
    fields(restaurant_id = %owner.restaurant_id())
)]
pub async fn put_category(
    pool: web::Data<DbPool>,
    owner: RestaurantOwner,
    path: web::Path<Uuid>,
    form: web::Json<CategoryForm>
) -> Result<HttpResponse, MenuRouteError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let category = update_category(conn, owner.restaurant_id(), path.into_inner(), form.into_inner()).await?;

    Ok(HttpResponse::Ok().json(category))
}

#[tracing::instrument(
    "Removing category",
    skip(pool, cache, owner),
    fields(restaurant_id = %owner.restaurant_id())
)]
pub async fn remove_category(
    pool: web::Data<DbPool>,
    cache: web::Data<ResponseCache>,
    owner: RestaurantOwner,
    path: web::Path<Uuid>
) -> Result<HttpResponse, MenuRouteError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    delete_category(conn, owner.restaurant_id(), path.into_inner()).await?;
    // Dishes of the category lost their category_id
    cache.invalidate(CacheKey::AllDishes).await;

    Ok(HttpResponse::NoContent().finish())
}

#[tracing::instrument(
    "Adding dish",
    skip(pool, cache, owner),
    fields(restaurant_id = %owner.restaurant_id())
)]
pub async fn post_dish(
    pool: web::Data<DbPool>,
    cache: web::Data<ResponseCache>,
    owner: RestaurantOwner,
    form: web::Json<DishForm>
) -> Result<HttpResponse, MenuRouteError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let dish = create_dish(conn, owner.restaurant_id(), form.into_inner()).await?;
    cache.invalidate(CacheKey::AllDishes).await;

    Ok(HttpResponse::Created().json(dish))
}

#[tracing::instrument(
    "Editing dish",
    skip(pool, cache, owner),
    fields(restaurant_id = %owner.restaurant_id())
)]
pub async fn put_dish(
    pool: web::Data<DbPool>,
    cache: web::Data<ResponseCache>,
    owner: RestaurantOwner,
    path: web::Path<Uuid>,
    form: web::Json<DishForm>
) -> Result<HttpResponse, MenuRouteError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let dish = update_dish(conn, owner.restaurant_id(), path.into_inner(), form.into_inner()).await?;
    cache.invalidate(CacheKey::AllDishes).await;

    Ok(HttpResponse::Ok().json(dish))
}

#[tracing::instrument(
    "Removing dish",
    skip(pool, cache, owner),
    fields(restaurant_id = %owner.restaurant_id())
)]
pub async fn remove_dish(
    pool: web::Data<DbPool>,
    cache: web::Data<ResponseCache>,
    owner: RestaurantOwner,
    path: web::Path<Uuid>
) -> Result<HttpResponse, MenuRouteError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    delete_dish(conn, owner.restaurant_id(), path.into_inner()).await?;
    cache.invalidate(CacheKey::AllDishes).await;

    Ok(HttpResponse::NoContent().finish())
}
