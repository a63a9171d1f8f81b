use actix_web::{http::StatusCode, HttpResponse, HttpResponseBuilder};
use serde_json::{json, Map, Value};

pub mod admin;
pub mod authentication;
pub mod catalogue;
pub mod health_check;
pub mod order;
pub mod profile;
pub mod registration;
pub mod reservation;
pub mod restaurant;
pub mod subscription;

pub use health_check::health_check;

// Key used for errors that are not tied to one field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// 400 response carrying `{"errors": {field: message}}`.
pub fn field_errors<'a>(errors: impl IntoIterator<Item = (&'a str, String)>) -> HttpResponse{
    let mut map = Map::new();
    for (field, message) in errors {
        map.entry(field.to_string())
            .or_insert(Value::String(message));
    }

    HttpResponse::BadRequest().json(json!({ "errors": map }))
}

pub fn error_message(status: StatusCode, message: impl std::fmt::Display) -> HttpResponse{
    HttpResponseBuilder::new(status).json(json!({ "error": message.to_string() }))
}
