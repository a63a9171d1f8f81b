use actix_web::HttpResponse;
use serde_json::json;

use crate::session_state::TypedSession;

#[tracing::instrument(
    "Logging out",
    skip_all
)]
pub async fn logout(
    session: TypedSession
) -> HttpResponse {
    if let Ok(Some(identity)) = session.get_identity() {
        tracing::info!(user_id = %identity.user_id, "Ending session");
    }
    session.purge();

    HttpResponse::Ok().json(json!({ "logged_out": true }))
}
