use actix_web::{http::header::ContentType, web, HttpResponse};
use anyhow::Context;

use super::CatalogueError;
use crate::{
    cache::{CacheKey, ResponseCache},
    db_interaction::catalogue::{list_dishes, list_restaurants, DishFilter, RestaurantFilter},
    utils::{get_pooled_connection, DbPool}
};

pub const CACHE_STATUS_HEADER: &str = "X-Cache";

async fn load_listing(pool: &web::Data<DbPool>, key: CacheKey) -> Result<String, anyhow::Error>{
    let conn = get_pooled_connection(pool)
        .await
        .context("Failed to get connection from pool")?;

    let body = match key {
        CacheKey::AllDishes => serde_json::to_string(&list_dishes(conn, DishFilter::default()).await?),
        CacheKey::AllRestaurants => serde_json::to_string(&list_restaurants(conn, RestaurantFilter::default()).await?)
    };

    body.context("Failed to serialize listing")
}

#[tracing::instrument(
    "Serving cached listing",
    skip(pool, cache)
)]
async fn serve_cached(
    pool: web::Data<DbPool>,
    cache: web::Data<ResponseCache>,
    key: CacheKey
) -> Result<HttpResponse, CatalogueError>{
    let (body, status) = match cache.get(key).await {
        Ok(body) => (body, "HIT"),
        Err(generation) => {
            tracing::info!(key = key.as_str(), "Cache miss, loading from database");
            let body = load_listing(&pool, key).await?;
            (cache.put(key, body, generation).await, "MISS")
        }
    };

    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .insert_header((CACHE_STATUS_HEADER, status))
        .body(body.as_str().to_owned()))
}

pub async fn get_cached_dishes(
    pool: web::Data<DbPool>,
    cache: web::Data<ResponseCache>
) -> Result<HttpResponse, CatalogueError>{
    serve_cached(pool, cache, CacheKey::AllDishes).await
}

pub async fn get_cached_restaurants(
    pool: web::Data<DbPool>,
    cache: web::Data<ResponseCache>
) -> Result<HttpResponse, CatalogueError>{
    serve_cached(pool, cache, CacheKey::AllRestaurants).await
}
