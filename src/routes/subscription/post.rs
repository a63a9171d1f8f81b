use actix_web::{web, HttpResponse};
use anyhow::Context;
use serde::Deserialize;
use uuid::Uuid;

use super::{resolve_holder, HolderQuery, SubscriptionError};
use crate::{
    auth::extractors::CurrentUser,
    db_interaction::subscriptions::{subscribe, update_subscription, SubscriptionUpdate},
    domain::subscription::{BillingCycle, PlanType},
    utils::{get_pooled_connection, BusinessClock, DbPool}
};

#[derive(Deserialize, Debug)]
pub struct CheckoutQuery{
    #[serde(default)]
    pub billing: BillingCycle
}

#[tracing::instrument(
    "Subscribing to plan",
    skip(pool, clock, user),
    fields(user_id = %user.0.user_id)
)]
pub async fn post_checkout(
    pool: web::Data<DbPool>,
    clock: web::Data<BusinessClock>,
    user: CurrentUser,
    path: web::Path<(PlanType, Uuid)>,
    query: web::Query<CheckoutQuery>
) -> Result<HttpResponse, SubscriptionError>{
    let (plan_type, plan_id) = path.into_inner();
    let holder = resolve_holder(&pool, user.0, plan_type).await?;

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let subscription = subscribe(conn, holder, plan_id, query.billing, clock.today()).await?;

    Ok(HttpResponse::Ok().json(subscription))
}

async fn apply_update(
    pool: web::Data<DbPool>,
    user: CurrentUser,
    plan_type: Option<PlanType>,
    update: SubscriptionUpdate
) -> Result<HttpResponse, SubscriptionError>{
    let holder = resolve_holder(&pool, user.0, plan_type.unwrap_or(PlanType::User)).await?;

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let subscription = update_subscription(conn, holder, update)
        .await?
        .ok_or(SubscriptionError::NoSubscription)?;

    Ok(HttpResponse::Ok().json(subscription))
}

#[tracing::instrument(
    "Cancelling subscription",
    skip(pool, user),
    fields(user_id = %user.0.user_id)
)]
pub async fn post_cancel_subscription(
    pool: web::Data<DbPool>,
    user: CurrentUser,
    query: web::Query<HolderQuery>
) -> Result<HttpResponse, SubscriptionError>{
    apply_update(pool, user, query.plan_type, SubscriptionUpdate::Cancel).await
}

#[derive(Deserialize, Debug)]
pub struct AutoRenewForm{
    pub auto_renew: bool
}

#[tracing::instrument(
    "Toggling subscription renewal",
    skip(pool, user),
    fields(user_id = %user.0.user_id)
)]
pub async fn post_auto_renew(
    pool: web::Data<DbPool>,
    user: CurrentUser,
    query: web::Query<HolderQuery>,
    form: web::Json<AutoRenewForm>
) -> Result<HttpResponse, SubscriptionError>{
    apply_update(pool, user, query.plan_type, SubscriptionUpdate::AutoRenew(form.auto_renew)).await
}
