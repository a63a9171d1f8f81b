use actix_web::{error::ErrorInternalServerError, web, HttpResponse};
use anyhow::Context;

use super::{resolve_holder, HolderQuery, SubscriptionError};
use crate::{
    auth::extractors::CurrentUser,
    db_interaction::subscriptions::{get_current_plan, list_plans},
    domain::subscription::PlanType,
    utils::{get_pooled_connection, BusinessClock, DbPool}
};

#[tracing::instrument(
    "Listing subscription plans",
    skip(pool)
)]
pub async fn get_plans(
    pool: web::Data<DbPool>,
    query: web::Query<HolderQuery>
) -> Result<HttpResponse, actix_web::Error>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")
        .map_err(ErrorInternalServerError)?;

    let plans = list_plans(conn, query.plan_type.unwrap_or(PlanType::User))
        .await
        .map_err(ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(plans))
}

#[tracing::instrument(
    "Getting current plan",
    skip(pool, clock, user),
    fields(user_id = %user.0.user_id)
)]
pub async fn get_my_plan(
    pool: web::Data<DbPool>,
    clock: web::Data<BusinessClock>,
    user: CurrentUser,
    query: web::Query<HolderQuery>
) -> Result<HttpResponse, SubscriptionError>{
    let holder = resolve_holder(&pool, user.0, query.plan_type.unwrap_or(PlanType::User)).await?;

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let plan = get_current_plan(conn, holder, clock.today())
        .await?
        .ok_or(SubscriptionError::NoSubscription)?;

    Ok(HttpResponse::Ok().json(plan))
}
