use std::{error::Error, fmt::Debug};

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use diesel::{
    dsl::count_star, BoolExpressionMethods, Connection, ExpressionMethods, JoinOnDsl, OptionalExtension,
    PgTextExpressionMethods, QueryDsl, RunQueryDsl, SelectableHelper
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    db_interaction::catalogue::like_pattern,
    domain::moderation::{ReasonField, RestaurantStatus, StatusEffects},
    models::{AdminNote, City, Restaurant, RestaurantAccount, StatusHistoryEntry, User},
    schema::{categories, cities, dishes, orders, restaurant_accounts, restaurant_admin_notes, restaurant_status_history, restaurants, users},
    telemetry::spawn_blocking_with_tracing,
    utils::{error_fmt_chain, DbConnection}
};

// Error associated with moving an account to a new moderation status
#[derive(Error)]
pub enum StatusChangeError{
    #[error("Tokio threadpool error occured")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("Failed to run query")]
    RunQueryError(#[from] diesel::result::Error),
    #[error("restaurant account {0} doesn't exist")]
    NoSuchAccount(Uuid)
}

impl Debug for StatusChangeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

// What the caller needs to notify the account holder
#[derive(Debug)]
pub struct StatusChange{
    pub account: RestaurantAccount,
    pub owner_email: String,
    pub restaurant_name: String
}

/// Applies a moderation status to an account: derived flags, reason column,
/// restaurant open flag and one history row, all in the caller's transaction.
pub fn apply_status_change(
    conn: &mut DbConnection,
    account_id: Uuid,
    new_status: RestaurantStatus,
    reason: Option<String>,
    actor: Uuid
) -> Result<StatusChange, StatusChangeError>{
    let account = restaurant_accounts::table
        .find(account_id)
        .select(RestaurantAccount::as_select())
        .for_update()
        .first::<RestaurantAccount>(conn)
        .optional()?
        .ok_or(StatusChangeError::NoSuchAccount(account_id))?;

    let effects = StatusEffects::of(new_status);
    let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    let now = Utc::now();

    diesel::update(restaurant_accounts::table.find(account_id))
        .set((
            restaurant_accounts::status.eq(new_status.as_str()),
            restaurant_accounts::is_active.eq(effects.is_active),
            restaurant_accounts::pending_approval.eq(effects.pending_approval),
            restaurant_accounts::status_changed_at.eq(Some(now)),
            restaurant_accounts::status_changed_by.eq(Some(actor))
        ))
        .execute(conn)?;

    match effects.reason_field {
        Some(ReasonField::Rejection) => {
            diesel::update(restaurant_accounts::table.find(account_id))
                .set(restaurant_accounts::rejection_reason.eq(&reason))
                .execute(conn)?;
        },
        Some(ReasonField::Sanction) => {
            diesel::update(restaurant_accounts::table.find(account_id))
                .set(restaurant_accounts::sanction_reason.eq(&reason))
                .execute(conn)?;
        },
        Some(ReasonField::Ban) => {
            diesel::update(restaurant_accounts::table.find(account_id))
                .set(restaurant_accounts::ban_reason.eq(&reason))
                .execute(conn)?;
        },
        None => {}
    }

    if let Some(is_open) = effects.restaurant_open {
        diesel::update(restaurants::table.find(account.restaurant_id))
            .set(restaurants::is_open.eq(is_open))
            .execute(conn)?;
    }

    diesel::insert_into(restaurant_status_history::table)
        .values(&StatusHistoryEntry{
            history_id: Uuid::new_v4(),
            account_id,
            changed_by: actor,
            old_status: account.status.clone(),
            new_status: new_status.as_str().to_string(),
            reason,
            created_at: now
        })
        .execute(conn)?;

    let (owner_email, restaurant_name) = users::table
        .inner_join(restaurant_accounts::table.on(restaurant_accounts::user_id.eq(users::user_id)))
        .inner_join(restaurants::table.on(restaurants::restaurant_id.eq(restaurant_accounts::restaurant_id)))
        .filter(restaurant_accounts::account_id.eq(account_id))
        .select((users::email, restaurants::name))
        .first::<(String, String)>(conn)?;

    let account = restaurant_accounts::table
        .find(account_id)
        .select(RestaurantAccount::as_select())
        .first::<RestaurantAccount>(conn)?;

    Ok(StatusChange{ account, owner_email, restaurant_name })
}

#[tracing::instrument(
    "Changing restaurant account status",
    skip(conn, reason)
)]
pub async fn change_account_status(
    mut conn: DbConnection,
    account_id: Uuid,
    new_status: RestaurantStatus,
    reason: Option<String>,
    actor: Uuid
) -> Result<StatusChange, StatusChangeError>{
    spawn_blocking_with_tracing(move || {
        conn.transaction::<StatusChange, StatusChangeError, _>(|conn| {
            apply_status_change(conn, account_id, new_status, reason, actor)
        })
    })
    .await?
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DateRange{
    Today,
    Week,
    Month
}

impl DateRange {
    // Earliest creation instant kept by the filter
    pub fn since(&self, now: DateTime<Utc>, today_start: DateTime<Utc>) -> DateTime<Utc>{
        match self {
            DateRange::Today => today_start,
            DateRange::Week => now - Duration::days(7),
            DateRange::Month => now - Duration::days(30)
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct AccountFilter{
    pub status: Option<RestaurantStatus>,
    pub city: Option<Uuid>,
    pub date_range: Option<DateRange>,
    pub search: Option<String>
}

#[derive(Serialize, Debug)]
pub struct AccountListing{
    pub account: RestaurantAccount,
    pub restaurant: Restaurant,
    pub city: City,
    pub username: String,
    pub email: String
}

#[derive(Serialize, Debug, Default, PartialEq, Eq)]
pub struct StatusCounts{
    pub pending: usize,
    pub approved: usize,
    pub sanctioned: usize,
    pub banned: usize,
    pub rejected: usize
}

impl StatusCounts {
    pub fn tally(accounts: &[AccountListing]) -> Self{
        let mut counts = StatusCounts::default();
        for listing in accounts {
            match RestaurantStatus::parse(&listing.account.status) {
                Some(RestaurantStatus::Pending) => counts.pending += 1,
                Some(RestaurantStatus::Approved) => counts.approved += 1,
                Some(RestaurantStatus::Sanctioned) => counts.sanctioned += 1,
                Some(RestaurantStatus::Banned) => counts.banned += 1,
                Some(RestaurantStatus::Rejected) => counts.rejected += 1,
                None => {}
            }
        }
        counts
    }
}

#[derive(Serialize, Debug)]
pub struct AccountList{
    pub accounts: Vec<AccountListing>,
    pub counts: StatusCounts
}

#[tracing::instrument(
    "Listing restaurant accounts for moderation",
    skip(conn)
)]
pub async fn list_accounts(
    mut conn: DbConnection,
    filter: AccountFilter,
    since: Option<DateTime<Utc>>
) -> Result<AccountList, anyhow::Error>{
    spawn_blocking_with_tracing(move || -> Result<AccountList, anyhow::Error> {
        let mut query = restaurant_accounts::table
            .inner_join(restaurants::table.inner_join(cities::table))
            .inner_join(users::table.on(users::user_id.eq(restaurant_accounts::user_id)))
            .select((
                RestaurantAccount::as_select(),
                Restaurant::as_select(),
                City::as_select(),
                users::username,
                users::email
            ))
            .into_boxed();

        if let Some(status) = filter.status {
            query = query.filter(restaurant_accounts::status.eq(status.as_str()));
        }
        if let Some(city_id) = filter.city {
            query = query.filter(restaurants::city_id.eq(city_id));
        }
        if let Some(since) = since {
            query = query.filter(restaurant_accounts::created_at.ge(since));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            query = query.filter(
                restaurants::name.ilike(pattern.clone())
                    .or(restaurants::address.ilike(pattern.clone()))
                    .or(cities::name.ilike(pattern.clone()))
                    .or(users::username.ilike(pattern.clone()))
                    .or(users::email.ilike(pattern))
            );
        }

        let rows = query
            .order(restaurant_accounts::created_at.desc())
            .load::<(RestaurantAccount, Restaurant, City, String, String)>(&mut conn)
            .context("Failed to load restaurant accounts")?;

        let accounts: Vec<AccountListing> = rows.into_iter()
            .map(|(account, restaurant, city, username, email)| AccountListing{ account, restaurant, city, username, email })
            .collect();

        let counts = StatusCounts::tally(&accounts);
        Ok(AccountList{ accounts, counts })
    })
    .await
    .context("Failed due to threadpool error")?
}

#[derive(Serialize, Debug)]
pub struct AccountDetail{
    pub account: RestaurantAccount,
    pub restaurant: Restaurant,
    pub owner: User,
    pub dishes_count: i64,
    pub categories_count: i64,
    pub orders_count: i64,
    pub notes: Vec<AdminNote>,
    pub history: Vec<StatusHistoryEntry>
}

#[tracing::instrument(
    "Getting restaurant account detail",
    skip(conn)
)]
pub async fn get_account_detail(
    mut conn: DbConnection,
    account_id: Uuid
) -> Result<Option<AccountDetail>, anyhow::Error>{
    spawn_blocking_with_tracing(move || -> Result<Option<AccountDetail>, anyhow::Error> {
        let found = restaurant_accounts::table
            .inner_join(restaurants::table)
            .inner_join(users::table.on(users::user_id.eq(restaurant_accounts::user_id)))
            .filter(restaurant_accounts::account_id.eq(account_id))
            .select((RestaurantAccount::as_select(), Restaurant::as_select(), User::as_select()))
            .first::<(RestaurantAccount, Restaurant, User)>(&mut conn)
            .optional()
            .context("Failed to get restaurant account")?;

        let Some((account, restaurant, owner)) = found else {
            return Ok(None)
        };
        let restaurant_id = restaurant.restaurant_id;

        let dishes_count = dishes::table
            .filter(dishes::restaurant_id.eq(restaurant_id))
            .select(count_star())
            .first::<i64>(&mut conn)
            .context("Failed to count dishes")?;

        let categories_count = categories::table
            .filter(categories::restaurant_id.eq(restaurant_id))
            .select(count_star())
            .first::<i64>(&mut conn)
            .context("Failed to count categories")?;

        let orders_count = orders::table
            .filter(orders::restaurant_id.eq(restaurant_id))
            .select(count_star())
            .first::<i64>(&mut conn)
            .context("Failed to count orders")?;

        let notes = restaurant_admin_notes::table
            .filter(restaurant_admin_notes::account_id.eq(account_id))
            .order(restaurant_admin_notes::created_at.desc())
            .select(AdminNote::as_select())
            .load::<AdminNote>(&mut conn)
            .context("Failed to load admin notes")?;

        let history = get_status_history(&mut conn, account_id)
            .context("Failed to load status history")?;

        Ok(Some(AccountDetail{
            account,
            restaurant,
            owner,
            dishes_count,
            categories_count,
            orders_count,
            notes,
            history
        }))
    })
    .await
    .context("Failed due to threadpool error")?
}

// History of an account, oldest first
pub fn get_status_history(conn: &mut DbConnection, account_id: Uuid) -> diesel::QueryResult<Vec<StatusHistoryEntry>>{
    restaurant_status_history::table
        .filter(restaurant_status_history::account_id.eq(account_id))
        .order(restaurant_status_history::created_at.asc())
        .select(StatusHistoryEntry::as_select())
        .load::<StatusHistoryEntry>(conn)
}

#[derive(Error)]
pub enum AddNoteError{
    #[error("Tokio threadpool error occured")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("Failed to run query")]
    RunQueryError(#[from] diesel::result::Error),
    #[error("The note cannot be empty")]
    EmptyNote,
    #[error("restaurant account {0} doesn't exist")]
    NoSuchAccount(Uuid)
}

impl Debug for AddNoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

#[tracing::instrument(
    "Adding admin note",
    skip(conn, content)
)]
pub async fn add_admin_note(
    mut conn: DbConnection,
    account_id: Uuid,
    admin_id: Uuid,
    content: String
) -> Result<AdminNote, AddNoteError>{
    let content = content.trim().to_string();
    if content.is_empty() {
        return Err(AddNoteError::EmptyNote)
    }

    spawn_blocking_with_tracing(move || {
        let exists = diesel::select(diesel::dsl::exists(
                restaurant_accounts::table.filter(restaurant_accounts::account_id.eq(account_id))
            ))
            .get_result::<bool>(&mut conn)?;

        if !exists {
            return Err(AddNoteError::NoSuchAccount(account_id))
        }

        let note = AdminNote{
            note_id: Uuid::new_v4(),
            account_id,
            admin_id,
            content,
            created_at: Utc::now()
        };

        diesel::insert_into(restaurant_admin_notes::table)
            .values(&note)
            .execute(&mut conn)?;

        Ok(note)
    })
    .await?
}
