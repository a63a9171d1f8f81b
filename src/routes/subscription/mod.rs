mod get;
mod post;

pub use get::*;
pub use post::*;

use std::{error::Error, fmt::Debug};

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use anyhow::Context;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    auth::extractors::Identity,
    db_interaction::{restaurants::get_active_account_for_user, subscriptions::SubscribeError},
    domain::subscription::{PlanType, SubscriptionHolder},
    routes::error_message,
    utils::{error_fmt_chain, get_pooled_connection, DbPool}
};

#[derive(Error)]
pub enum SubscriptionError{
    #[error("Restaurant plans require an active restaurant account")]
    NoRestaurantAccount,
    #[error("No active subscription")]
    NoSubscription,
    #[error("{0}")]
    PlanRejected(String),
    #[error("Unexpected error occured")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for SubscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl From<SubscribeError> for SubscriptionError {
    fn from(e: SubscribeError) -> Self {
        match e {
            SubscribeError::NoSuchPlan(_) | SubscribeError::PlanTypeMismatch(_) => {
                SubscriptionError::PlanRejected(e.to_string())
            },
            other => SubscriptionError::UnexpectedError(other.into())
        }
    }
}

impl ResponseError for SubscriptionError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscriptionError::NoRestaurantAccount => StatusCode::FORBIDDEN,
            SubscriptionError::NoSubscription => StatusCode::NOT_FOUND,
            SubscriptionError::PlanRejected(_) => StatusCode::BAD_REQUEST,
            SubscriptionError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        error_message(self.status_code(), self)
    }
}

// Which subscription a request acts on, users default to their own
#[derive(Deserialize, Debug)]
pub struct HolderQuery{
    pub plan_type: Option<PlanType>
}

pub async fn resolve_holder(
    pool: &web::Data<DbPool>,
    identity: Identity,
    plan_type: PlanType
) -> Result<SubscriptionHolder, SubscriptionError>{
    match plan_type {
        PlanType::User => Ok(SubscriptionHolder::User(identity.user_id)),
        PlanType::Restaurant => {
            let conn = get_pooled_connection(pool)
                .await
                .context("Failed to get connection from pool")?;

            get_active_account_for_user(conn, identity.user_id)
                .await?
                .map(|account| SubscriptionHolder::Restaurant(account.account_id))
                .ok_or(SubscriptionError::NoRestaurantAccount)
        }
    }
}
