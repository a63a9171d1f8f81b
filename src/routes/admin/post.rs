use std::{error::Error, fmt::Debug};

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use anyhow::Context;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    auth::extractors::IsSuperuser,
    cache::{CacheKey, ResponseCache},
    db_interaction::{
        drafts::{approve_draft, reject_draft, DraftReviewError},
        moderation::{add_admin_note, change_account_status, AddNoteError, StatusChangeError}
    },
    domain::moderation::{notification_for, RestaurantStatus},
    email_client::EmailClient,
    routes::{error_message, field_errors},
    startup::BaseUrl,
    utils::{error_fmt_chain, get_pooled_connection, DbPool}
};

#[derive(Error)]
pub enum ModerationError{
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{message}")]
    Invalid{ field: &'static str, message: String },
    #[error("{0}")]
    Conflict(String),
    #[error("Unexpected error occured")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for ModerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl From<StatusChangeError> for ModerationError {
    fn from(e: StatusChangeError) -> Self {
        match e {
            StatusChangeError::NoSuchAccount(_) => ModerationError::NotFound("Restaurant account"),
            other => ModerationError::UnexpectedError(other.into())
        }
    }
}

impl From<AddNoteError> for ModerationError {
    fn from(e: AddNoteError) -> Self {
        match e {
            AddNoteError::EmptyNote => ModerationError::Invalid{ field: "content", message: e.to_string() },
            AddNoteError::NoSuchAccount(_) => ModerationError::NotFound("Restaurant account"),
            other => ModerationError::UnexpectedError(other.into())
        }
    }
}

impl From<DraftReviewError> for ModerationError {
    fn from(e: DraftReviewError) -> Self {
        match e {
            DraftReviewError::NoSuchDraft(_) => ModerationError::NotFound("Draft"),
            DraftReviewError::AlreadyReviewed(_) | DraftReviewError::OwnerTaken(_) => {
                ModerationError::Conflict(e.to_string())
            },
            other => ModerationError::UnexpectedError(other.into())
        }
    }
}

impl ResponseError for ModerationError {
    fn status_code(&self) -> StatusCode {
        match self {
            ModerationError::NotFound(_) => StatusCode::NOT_FOUND,
            ModerationError::Invalid{ .. } => StatusCode::BAD_REQUEST,
            ModerationError::Conflict(_) => StatusCode::CONFLICT,
            ModerationError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        match self {
            ModerationError::Invalid{ field, message } => field_errors([(*field, message.clone())]),
            _ => error_message(self.status_code(), self)
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct StatusUpdateForm{
    pub status: RestaurantStatus,
    pub reason: Option<String>
}

/// Moves an account to a new moderation status and emails its holder.
#[tracing::instrument(
    "Updating restaurant account status",
    skip(pool, email_client, cache, admin, form),
    fields(admin_id = %admin.0, status = form.status.as_str())
)]
pub async fn update_restaurant_status(
    pool: web::Data<DbPool>,
    email_client: web::Data<EmailClient>,
    cache: web::Data<ResponseCache>,
    admin: IsSuperuser,
    path: web::Path<Uuid>,
    form: web::Json<StatusUpdateForm>
) -> Result<HttpResponse, ModerationError>{
    let form = form.into_inner();
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let change = change_account_status(conn, path.into_inner(), form.status, form.reason, admin.0).await?;
    cache.invalidate(CacheKey::AllRestaurants).await;

    let reason = match form.status {
        RestaurantStatus::Sanctioned => change.account.sanction_reason.as_deref(),
        RestaurantStatus::Banned => change.account.ban_reason.as_deref(),
        RestaurantStatus::Rejected => change.account.rejection_reason.as_deref(),
        _ => None
    };
    let (subject, body) = notification_for(form.status, &change.restaurant_name, reason);
    email_client.notify(&change.owner_email, subject, body);

    Ok(HttpResponse::Ok().json(change.account))
}

#[derive(Deserialize, Debug)]
pub struct NoteForm{
    pub content: String
}

#[tracing::instrument(
    "Adding note to restaurant account",
    skip(pool, admin, form),
    fields(admin_id = %admin.0)
)]
pub async fn post_admin_note(
    pool: web::Data<DbPool>,
    admin: IsSuperuser,
    path: web::Path<Uuid>,
    form: web::Json<NoteForm>
) -> Result<HttpResponse, ModerationError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let note = add_admin_note(conn, path.into_inner(), admin.0, form.into_inner().content).await?;

    Ok(HttpResponse::Created().json(note))
}

#[tracing::instrument(
    "Approving restaurant draft",
    skip(pool, email_client, cache, base_url, admin),
    fields(admin_id = %admin.0)
)]
pub async fn post_approve_draft(
    pool: web::Data<DbPool>,
    email_client: web::Data<EmailClient>,
    cache: web::Data<ResponseCache>,
    base_url: web::Data<BaseUrl>,
    admin: IsSuperuser,
    path: web::Path<Uuid>
) -> Result<HttpResponse, ModerationError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let approved = approve_draft(conn, path.into_inner(), admin.0).await?;
    cache.invalidate(CacheKey::AllRestaurants).await;

    email_client.notify(
        &approved.owner.email,
        format!("{} is now on FoodFlex", approved.restaurant.name),
        format!(
            "Your registration was approved.\nUsername: {}\nPassword: {}\nLog in at {}/login and change your password.",
            approved.owner.username,
            approved.password.expose_secret(),
            base_url.0
        )
    );

    Ok(HttpResponse::Ok().json(json!({
        "draft": approved.draft,
        "restaurant": approved.restaurant,
        "account": approved.account,
        "username": approved.owner.username
    })))
}

#[derive(Deserialize, Debug)]
pub struct RejectDraftForm{
    #[serde(default)]
    pub notes: String
}

#[tracing::instrument(
    "Rejecting restaurant draft",
    skip(pool, email_client, _admin, form)
)]
pub async fn post_reject_draft(
    pool: web::Data<DbPool>,
    email_client: web::Data<EmailClient>,
    _admin: IsSuperuser,
    path: web::Path<Uuid>,
    form: web::Json<RejectDraftForm>
) -> Result<HttpResponse, ModerationError>{
    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;

    let draft = reject_draft(conn, path.into_inner(), form.into_inner().notes).await?;

    let (subject, body) = notification_for(
        RestaurantStatus::Rejected,
        &draft.name,
        Some(draft.admin_notes.as_str()).filter(|n| !n.is_empty())
    );
    email_client.notify(&draft.owner_email, subject, body);

    Ok(HttpResponse::Ok().json(draft))
}
