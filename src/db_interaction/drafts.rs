use std::{error::Error, fmt::Debug};

use anyhow::Context;
use chrono::Utc;
use diesel::{Connection, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    db_interaction::{
        moderation::{apply_status_change, StatusChangeError},
        user::{insert_user, NewUser, UserInsertError}
    },
    domain::{
        moderation::RestaurantStatus,
        registration::{username_from_email, BasicInfo, Documents, DraftStatus, OwnerInfo}
    },
    models::{Restaurant, RestaurantAccount, RestaurantDraft, User},
    password::{generate_password, hash_password},
    schema::{restaurant_accounts, restaurant_drafts, restaurants, users},
    telemetry::spawn_blocking_with_tracing,
    utils::{error_fmt_chain, generate_code, DbConnection}
};

#[tracing::instrument(
    "Saving restaurant draft",
    skip_all,
    fields(restaurant = %basic.name)
)]
pub async fn insert_draft(
    mut conn: DbConnection,
    basic: BasicInfo,
    owner: OwnerInfo,
    documents: Documents
) -> Result<RestaurantDraft, anyhow::Error>{
    let now = Utc::now();
    let draft = RestaurantDraft{
        draft_id: Uuid::new_v4(),
        name: basic.name.trim().to_string(),
        city_id: basic.city_id,
        address: basic.address.trim().to_string(),
        phone: basic.phone.trim().to_string(),
        email: basic.email.trim().to_string(),
        website: basic.website,
        description: basic.description,
        capacity: basic.capacity,
        owner_first_name: owner.owner_first_name.trim().to_string(),
        owner_last_name: owner.owner_last_name.trim().to_string(),
        owner_email: owner.owner_email.trim().to_string(),
        owner_phone: owner.owner_phone.trim().to_string(),
        owner_id_card: documents.owner_id_card,
        business_registration: documents.business_registration,
        food_safety_certificate: documents.food_safety_certificate,
        tax_document: documents.tax_document.filter(|p| !p.trim().is_empty()),
        main_image: documents.main_image,
        interior_image: documents.interior_image,
        menu_sample: documents.menu_sample,
        status: DraftStatus::Pending.as_str().to_string(),
        admin_notes: String::new(),
        created_at: now,
        updated_at: now
    };

    spawn_blocking_with_tracing(move || {
        diesel::insert_into(restaurant_drafts::table)
            .values(&draft)
            .execute(&mut conn)
            .context("Failed to insert restaurant draft")?;

        Ok(draft)
    })
    .await
    .context("Failed due to threadpool error")?
}

#[tracing::instrument(
    "Getting superuser emails",
    skip(conn)
)]
pub async fn superuser_emails(mut conn: DbConnection) -> Result<Vec<String>, anyhow::Error>{
    spawn_blocking_with_tracing(move || {
        users::table
            .filter(users::is_superuser.eq(true))
            .select(users::email)
            .load::<String>(&mut conn)
            .context("Failed to load superuser emails")
    })
    .await
    .context("Failed due to threadpool error")?
}

#[tracing::instrument(
    "Listing restaurant drafts",
    skip(conn)
)]
pub async fn list_drafts(
    mut conn: DbConnection,
    status: Option<DraftStatus>
) -> Result<Vec<RestaurantDraft>, anyhow::Error>{
    spawn_blocking_with_tracing(move || {
        let mut query = restaurant_drafts::table
            .select(RestaurantDraft::as_select())
            .into_boxed();

        if let Some(status) = status {
            query = query.filter(restaurant_drafts::status.eq(status.as_str()));
        }

        query
            .order(restaurant_drafts::created_at.desc())
            .load::<RestaurantDraft>(&mut conn)
            .context("Failed to load restaurant drafts")
    })
    .await
    .context("Failed due to threadpool error")?
}

// Errors associated with reviewing a draft
#[derive(Error)]
pub enum DraftReviewError{
    #[error("Tokio threadpool error occured")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("Failed to run query")]
    RunQueryError(#[from] diesel::result::Error),
    #[error("draft {0} doesn't exist")]
    NoSuchDraft(Uuid),
    #[error("draft was already {0}")]
    AlreadyReviewed(String),
    #[error("owner {0} is already taken")]
    OwnerTaken(&'static str),
    #[error("unexpected error occured")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for DraftReviewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl From<UserInsertError> for DraftReviewError {
    fn from(e: UserInsertError) -> Self {
        match e {
            UserInsertError::NotUnique(field) => DraftReviewError::OwnerTaken(field),
            UserInsertError::QueryError(e) => DraftReviewError::RunQueryError(e),
            UserInsertError::UnexpectedError(e) => DraftReviewError::UnexpectedError(e)
        }
    }
}

impl From<StatusChangeError> for DraftReviewError {
    fn from(e: StatusChangeError) -> Self {
        match e {
            StatusChangeError::RunQueryError(e) => DraftReviewError::RunQueryError(e),
            other => DraftReviewError::UnexpectedError(anyhow::anyhow!(other.to_string()))
        }
    }
}

fn lock_pending_draft(conn: &mut DbConnection, draft_id: Uuid) -> Result<RestaurantDraft, DraftReviewError>{
    let draft = restaurant_drafts::table
        .find(draft_id)
        .select(RestaurantDraft::as_select())
        .for_update()
        .first::<RestaurantDraft>(conn)
        .optional()?
        .ok_or(DraftReviewError::NoSuchDraft(draft_id))?;

    if draft.status != DraftStatus::Pending.as_str() {
        return Err(DraftReviewError::AlreadyReviewed(draft.status))
    }
    Ok(draft)
}

#[derive(Debug)]
pub struct ApprovedDraft{
    pub draft: RestaurantDraft,
    pub owner: User,
    pub restaurant: Restaurant,
    pub account: RestaurantAccount,
    pub password: SecretString
}

/// Turns a pending draft into an owner user, a restaurant and an approved
/// restaurant account. The account goes through the moderation transition
/// so the approval is recorded in its history.
#[tracing::instrument(
    "Approving restaurant draft",
    skip(conn)
)]
pub async fn approve_draft(
    mut conn: DbConnection,
    draft_id: Uuid,
    admin_id: Uuid
) -> Result<ApprovedDraft, DraftReviewError>{
    let password = generate_password();
    let password_hash = hash_password(SecretString::from(password.expose_secret().to_string())).await?;

    spawn_blocking_with_tracing(move || {
        conn.transaction::<ApprovedDraft, DraftReviewError, _>(|conn| {
            let mut draft = lock_pending_draft(conn, draft_id)?;

            let owner = insert_user(
                conn,
                NewUser{
                    username: username_from_email(&draft.owner_email, &generate_code(4)),
                    email: draft.owner_email.clone(),
                    first_name: draft.owner_first_name.clone(),
                    last_name: draft.owner_last_name.clone(),
                    is_superuser: false
                },
                password_hash
            )?;

            let now = Utc::now();
            let restaurant = Restaurant{
                restaurant_id: Uuid::new_v4(),
                name: draft.name.clone(),
                city_id: draft.city_id,
                address: draft.address.clone(),
                phone: draft.phone.clone(),
                email: draft.email.clone(),
                website: draft.website.clone(),
                description: draft.description.clone(),
                capacity: draft.capacity,
                is_open: false,
                created_at: now
            };
            diesel::insert_into(restaurants::table)
                .values(&restaurant)
                .execute(conn)?;

            let pending = RestaurantAccount{
                account_id: Uuid::new_v4(),
                user_id: owner.user_id,
                restaurant_id: restaurant.restaurant_id,
                status: RestaurantStatus::Pending.as_str().to_string(),
                is_active: false,
                pending_approval: true,
                rejection_reason: None,
                sanction_reason: None,
                ban_reason: None,
                status_changed_at: None,
                status_changed_by: None,
                account_type: "basic".to_string(),
                created_at: now
            };
            diesel::insert_into(restaurant_accounts::table)
                .values(&pending)
                .execute(conn)?;

            let change = apply_status_change(
                conn,
                pending.account_id,
                RestaurantStatus::Approved,
                Some("Registration approved".to_string()),
                admin_id
            )?;

            draft.status = DraftStatus::Approved.as_str().to_string();
            draft.updated_at = now;
            diesel::update(restaurant_drafts::table.find(draft_id))
                .set((
                    restaurant_drafts::status.eq(&draft.status),
                    restaurant_drafts::updated_at.eq(draft.updated_at)
                ))
                .execute(conn)?;

            let restaurant = Restaurant{ is_open: true, ..restaurant };

            Ok(ApprovedDraft{
                draft,
                owner,
                restaurant,
                account: change.account,
                password
            })
        })
    })
    .await?
}

#[tracing::instrument(
    "Rejecting restaurant draft",
    skip(conn, notes)
)]
pub async fn reject_draft(
    mut conn: DbConnection,
    draft_id: Uuid,
    notes: String
) -> Result<RestaurantDraft, DraftReviewError>{
    spawn_blocking_with_tracing(move || {
        conn.transaction::<RestaurantDraft, DraftReviewError, _>(|conn| {
            let mut draft = lock_pending_draft(conn, draft_id)?;

            draft.status = DraftStatus::Rejected.as_str().to_string();
            draft.admin_notes = notes.trim().to_string();
            draft.updated_at = Utc::now();

            diesel::update(restaurant_drafts::table.find(draft_id))
                .set((
                    restaurant_drafts::status.eq(&draft.status),
                    restaurant_drafts::admin_notes.eq(&draft.admin_notes),
                    restaurant_drafts::updated_at.eq(draft.updated_at)
                ))
                .execute(conn)?;

            Ok(draft)
        })
    })
    .await?
}
