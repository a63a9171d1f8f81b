use std::{error::Error, fmt::Debug};

use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    db_interaction::drafts::{insert_draft, superuser_emails},
    domain::registration::{BasicInfo, Documents, FieldErrors, OwnerInfo, WizardStep},
    email_client::EmailClient,
    routes::{error_message, field_errors, NON_FIELD_ERRORS},
    session_state::TypedSession,
    utils::{error_fmt_chain, get_pooled_connection, DbPool}
};

const STEPS: [WizardStep; 3] = [WizardStep::BasicInfo, WizardStep::OwnerInfo, WizardStep::Documents];

#[derive(Error)]
pub enum RegistrationError{
    #[error("Unknown registration step {0}")]
    UnknownStep(String),
    #[error("invalid registration step")]
    ValidationError(FieldErrors),
    #[error("Unexpected error occured")]
    UnexpectedError(#[from] anyhow::Error)
}

impl Debug for RegistrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

impl ResponseError for RegistrationError {
    fn status_code(&self) -> StatusCode {
        match self {
            RegistrationError::UnknownStep(_) => StatusCode::NOT_FOUND,
            RegistrationError::ValidationError(_) => StatusCode::BAD_REQUEST,
            RegistrationError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        match self {
            RegistrationError::ValidationError(errors) => field_errors(errors.iter().map(|(f, m)| (*f, m.clone()))),
            _ => error_message(self.status_code(), self)
        }
    }
}

fn parse_step<T: DeserializeOwned>(body: Value) -> Result<T, RegistrationError>{
    serde_json::from_value(body)
        .map_err(|e| RegistrationError::ValidationError(vec![(NON_FIELD_ERRORS, e.to_string())]))
}

fn step_name(step: WizardStep) -> &'static str{
    match step {
        WizardStep::BasicInfo => "basic_info",
        WizardStep::OwnerInfo => "owner_info",
        WizardStep::Documents => "documents"
    }
}

/// Validates one wizard step and keeps it in the session until `finish`.
#[tracing::instrument(
    "Saving registration step",
    skip(session, body)
)]
pub async fn post_registration_step(
    session: TypedSession,
    path: web::Path<String>,
    body: web::Json<Value>
) -> Result<HttpResponse, RegistrationError>{
    let step = WizardStep::parse(&path).ok_or_else(|| RegistrationError::UnknownStep(path.into_inner()))?;
    let body = body.into_inner();

    let stored = match step {
        WizardStep::BasicInfo => {
            let info: BasicInfo = parse_step(body)?;
            info.validate().map_err(RegistrationError::ValidationError)?;
            session.insert_json(step.session_key(), &info)
        },
        WizardStep::OwnerInfo => {
            let info: OwnerInfo = parse_step(body)?;
            info.validate().map_err(RegistrationError::ValidationError)?;
            session.insert_json(step.session_key(), &info)
        },
        WizardStep::Documents => {
            let documents: Documents = parse_step(body)?;
            documents.validate().map_err(RegistrationError::ValidationError)?;
            session.insert_json(step.session_key(), &documents)
        }
    };
    stored.context("Failed to store registration step in session")?;

    let completed: Vec<&str> = STEPS.iter()
        .filter(|s| matches!(session.get_json::<Value>(s.session_key()), Ok(Some(_))))
        .map(|s| step_name(*s))
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "step": step_name(step),
        "completed_steps": completed
    })))
}

fn stored_step<T: DeserializeOwned>(
    session: &TypedSession,
    step: WizardStep,
    missing: &mut FieldErrors
) -> Result<Option<T>, RegistrationError>{
    let value = session.get_json::<T>(step.session_key())
        .context("Failed to read registration step from session")?;

    if value.is_none() {
        missing.push((step_name(step), "This step is incomplete".to_string()));
    }
    Ok(value)
}

/// Persists the collected steps as a draft awaiting review and notifies the
/// superusers and the owner.
#[tracing::instrument(
    "Finishing restaurant registration",
    skip(pool, email_client, session)
)]
pub async fn post_registration_finish(
    pool: web::Data<DbPool>,
    email_client: web::Data<EmailClient>,
    session: TypedSession
) -> Result<HttpResponse, RegistrationError>{
    let mut missing = Vec::new();
    let basic = stored_step::<BasicInfo>(&session, WizardStep::BasicInfo, &mut missing)?;
    let owner = stored_step::<OwnerInfo>(&session, WizardStep::OwnerInfo, &mut missing)?;
    let documents = stored_step::<Documents>(&session, WizardStep::Documents, &mut missing)?;

    let (Some(basic), Some(owner), Some(documents)) = (basic, owner, documents) else {
        return Err(RegistrationError::ValidationError(missing))
    };

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;
    let draft = insert_draft(conn, basic, owner, documents).await?;

    for step in STEPS {
        session.remove(step.session_key());
    }

    let conn = get_pooled_connection(&pool)
        .await
        .context("Failed to get connection from pool")?;
    for admin_email in superuser_emails(conn).await? {
        email_client.notify(
            &admin_email,
            format!("New restaurant registration: {}", draft.name),
            format!(
                "{} {} registered {}. Review draft {} in the admin dashboard.",
                draft.owner_first_name, draft.owner_last_name, draft.name, draft.draft_id
            )
        );
    }
    email_client.notify(
        &draft.owner_email,
        "We received your registration".to_string(),
        format!(
            "Thank you for registering {} on FoodFlex. Our team will review your application shortly.",
            draft.name
        )
    );

    Ok(HttpResponse::Created().json(draft))
}
