use actix_web::{error::{ErrorInternalServerError, ErrorNotFound}, web, HttpResponse};
use anyhow::Context;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::extractors::IsSuperuser,
    db_interaction::{
        drafts::list_drafts,
        moderation::{get_account_detail, list_accounts, AccountFilter}
    },
    domain::registration::DraftStatus,
    utils::{get_pooled_connection, BusinessClock, DbPool}
};

#[tracing::instrument(
    "Listing restaurants for moderation",
    skip(pool, clock, _admin)
)]
pub async fn get_admin_restaurants(
    pool: web::Data<DbPool>,
    clock: web::Data<BusinessClock>,
    _admin: IsSuperuser,
    filter: web::Query<AccountFilter>
) -> Result<HttpResponse, actix_web::Error>{
    let filter = filter.into_inner();
    let (today_start, _) = clock.day_bounds(clock.today());
    let since = filter.date_range.map(|range| range.since(Utc::now(), today_start));

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")
        .map_err(ErrorInternalServerError)?;

    let list = list_accounts(conn, filter, since)
        .await
        .map_err(ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(list))
}

#[tracing::instrument(
    "Getting restaurant account detail",
    skip(pool, _admin)
)]
pub async fn get_admin_restaurant(
    pool: web::Data<DbPool>,
    _admin: IsSuperuser,
    path: web::Path<Uuid>
) -> Result<HttpResponse, actix_web::Error>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")
        .map_err(ErrorInternalServerError)?;

    match get_account_detail(conn, path.into_inner())
        .await
        .map_err(ErrorInternalServerError)?
    {
        Some(detail) => Ok(HttpResponse::Ok().json(detail)),
        None => Err(ErrorNotFound("Restaurant account not found"))
    }
}

#[derive(Deserialize, Debug)]
pub struct DraftListQuery{
    pub status: Option<DraftStatus>
}

#[tracing::instrument(
    "Listing restaurant drafts",
    skip(pool, _admin)
)]
pub async fn get_drafts(
    pool: web::Data<DbPool>,
    _admin: IsSuperuser,
    query: web::Query<DraftListQuery>
) -> Result<HttpResponse, actix_web::Error>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")
        .map_err(ErrorInternalServerError)?;

    let drafts = list_drafts(conn, query.into_inner().status)
        .await
        .map_err(ErrorInternalServerError)?;

    Ok(HttpResponse::Ok().json(drafts))
}
