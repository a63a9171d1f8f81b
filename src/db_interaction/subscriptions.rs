use std::{error::Error, fmt::Debug};

use anyhow::Context;
use chrono::NaiveDate;
use diesel::{Connection, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    domain::{
        order::format_cents,
        subscription::{days_remaining, end_date, is_active, price_for, BillingCycle, PlanType, SubscriptionHolder, SubscriptionStatus}
    },
    models::{Subscription, SubscriptionPlan},
    schema::{subscription_plans, subscriptions},
    telemetry::spawn_blocking_with_tracing,
    utils::{error_fmt_chain, DbConnection}
};

#[tracing::instrument(
    "Listing subscription plans",
    skip(conn)
)]
pub async fn list_plans(
    mut conn: DbConnection,
    plan_type: PlanType
) -> Result<Vec<SubscriptionPlan>, anyhow::Error>{
    spawn_blocking_with_tracing(move || {
        subscription_plans::table
            .filter(subscription_plans::plan_type.eq(plan_type.as_str()))
            .filter(subscription_plans::is_active.eq(true))
            .order(subscription_plans::price_monthly.asc())
            .select(SubscriptionPlan::as_select())
            .load::<SubscriptionPlan>(&mut conn)
            .context("Failed to load subscription plans")
    })
    .await
    .context("Failed due to threadpool error")?
}

fn find_held(conn: &mut DbConnection, holder: SubscriptionHolder) -> diesel::QueryResult<Option<Subscription>>{
    let query = subscriptions::table
        .select(Subscription::as_select())
        .into_boxed();

    let query = match holder {
        SubscriptionHolder::User(user_id) => query.filter(subscriptions::user_id.eq(user_id)),
        SubscriptionHolder::Restaurant(account_id) => query.filter(subscriptions::account_id.eq(account_id))
    };

    query.first::<Subscription>(conn).optional()
}

#[derive(Error)]
pub enum SubscribeError{
    #[error("Tokio threadpool error occured")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("Failed to run query")]
    RunQueryError(#[from] diesel::result::Error),
    #[error("plan {0} doesn't exist or is no longer offered")]
    NoSuchPlan(Uuid),
    #[error("this plan is reserved for {0} subscriptions")]
    PlanTypeMismatch(&'static str)
}

impl Debug for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

/// Subscribes a holder to a plan for one billing period from `today`,
/// replacing any subscription the holder already has.
#[tracing::instrument(
    "Subscribing to plan",
    skip(conn)
)]
pub async fn subscribe(
    mut conn: DbConnection,
    holder: SubscriptionHolder,
    plan_id: Uuid,
    cycle: BillingCycle,
    today: NaiveDate
) -> Result<Subscription, SubscribeError>{
    spawn_blocking_with_tracing(move || {
        conn.transaction::<Subscription, SubscribeError, _>(|conn| {
            let plan = subscription_plans::table
                .find(plan_id)
                .filter(subscription_plans::is_active.eq(true))
                .select(SubscriptionPlan::as_select())
                .first::<SubscriptionPlan>(conn)
                .optional()?
                .ok_or(SubscribeError::NoSuchPlan(plan_id))?;

            if plan.plan_type != holder.plan_type().as_str() {
                let expected = PlanType::parse(&plan.plan_type).unwrap_or(PlanType::User);
                return Err(SubscribeError::PlanTypeMismatch(expected.as_str()))
            }

            let price = price_for(cycle, plan.price_monthly, plan.price_yearly);
            let notes = format!("{} subscription - price: {}", cycle.label(), format_cents(price as i64));
            let end = end_date(today, cycle);

            let subscription = match find_held(conn, holder)? {
                Some(existing) => {
                    let updated = Subscription{
                        plan_id,
                        start_date: today,
                        end_date: end,
                        status: SubscriptionStatus::Active.as_str().to_string(),
                        notes,
                        ..existing
                    };

                    diesel::update(subscriptions::table.find(updated.subscription_id))
                        .set((
                            subscriptions::plan_id.eq(updated.plan_id),
                            subscriptions::start_date.eq(updated.start_date),
                            subscriptions::end_date.eq(updated.end_date),
                            subscriptions::status.eq(&updated.status),
                            subscriptions::notes.eq(&updated.notes)
                        ))
                        .execute(conn)?;
                    updated
                },
                None => {
                    let (user_id, account_id) = match holder {
                        SubscriptionHolder::User(id) => (Some(id), None),
                        SubscriptionHolder::Restaurant(id) => (None, Some(id))
                    };
                    let created = Subscription{
                        subscription_id: Uuid::new_v4(),
                        plan_id,
                        user_id,
                        account_id,
                        start_date: today,
                        end_date: end,
                        status: SubscriptionStatus::Active.as_str().to_string(),
                        is_auto_renew: true,
                        notes
                    };

                    diesel::insert_into(subscriptions::table)
                        .values(&created)
                        .execute(conn)?;
                    created
                }
            };

            Ok(subscription)
        })
    })
    .await?
}

#[derive(Serialize, Debug)]
pub struct CurrentPlan{
    pub subscription: Subscription,
    pub plan: SubscriptionPlan,
    pub is_active: bool,
    pub days_remaining: i64
}

#[tracing::instrument(
    "Getting current subscription",
    skip(conn)
)]
pub async fn get_current_plan(
    mut conn: DbConnection,
    holder: SubscriptionHolder,
    today: NaiveDate
) -> Result<Option<CurrentPlan>, anyhow::Error>{
    spawn_blocking_with_tracing(move || -> Result<Option<CurrentPlan>, anyhow::Error> {
        let Some(subscription) = find_held(&mut conn, holder).context("Failed to get subscription")? else {
            return Ok(None)
        };

        let plan = subscription_plans::table
            .find(subscription.plan_id)
            .select(SubscriptionPlan::as_select())
            .first::<SubscriptionPlan>(&mut conn)
            .context("Failed to get subscription plan")?;

        let status = SubscriptionStatus::parse(&subscription.status).unwrap_or(SubscriptionStatus::Expired);

        Ok(Some(CurrentPlan{
            is_active: is_active(status, subscription.end_date, today),
            days_remaining: days_remaining(subscription.end_date, today),
            subscription,
            plan
        }))
    })
    .await
    .context("Failed due to threadpool error")?
}

#[derive(Debug, Clone, Copy)]
pub enum SubscriptionUpdate{
    Cancel,
    AutoRenew(bool)
}

/// Cancels the holder's active subscription or toggles its renewal. The row
/// is kept either way. Returns `None` when there is no active subscription.
#[tracing::instrument(
    "Updating subscription",
    skip(conn)
)]
pub async fn update_subscription(
    mut conn: DbConnection,
    holder: SubscriptionHolder,
    update: SubscriptionUpdate
) -> Result<Option<Subscription>, anyhow::Error>{
    spawn_blocking_with_tracing(move || -> Result<Option<Subscription>, anyhow::Error> {
        let subscription = find_held(&mut conn, holder)
            .context("Failed to get subscription")?
            .filter(|s| s.status == SubscriptionStatus::Active.as_str());

        let Some(mut subscription) = subscription else {
            return Ok(None)
        };

        match update {
            SubscriptionUpdate::Cancel => {
                subscription.status = SubscriptionStatus::Canceled.as_str().to_string();
            },
            SubscriptionUpdate::AutoRenew(flag) => {
                subscription.is_auto_renew = flag;
            }
        }

        diesel::update(subscriptions::table.find(subscription.subscription_id))
            .set((
                subscriptions::status.eq(&subscription.status),
                subscriptions::is_auto_renew.eq(subscription.is_auto_renew)
            ))
            .execute(&mut conn)
            .context("Failed to update subscription")?;

        Ok(Some(subscription))
    })
    .await
    .context("Failed due to threadpool error")?
}
