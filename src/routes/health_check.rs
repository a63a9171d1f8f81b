use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::utils::{get_pooled_connection, DbPool};

// Reports whether the api is up and can reach the database
#[tracing::instrument(
    "Checking if api is online",
    skip(pool)
)]
pub async fn health_check(pool: web::Data<DbPool>) -> HttpResponse{
    match get_pooled_connection(&pool).await {
        Ok(_) => HttpResponse::Ok().json(json!({ "status": "ok", "database": "ok" })),
        Err(e) => {
            tracing::error!(error = ?e, "Database unreachable");
            HttpResponse::ServiceUnavailable().json(json!({ "status": "degraded", "database": "unreachable" }))
        }
    }
}
