pub mod admin_middleware;
pub mod auth;
pub mod cache;
pub mod configuration;
pub mod db_interaction;
pub mod domain;
pub mod email_client;
pub mod models;
pub mod password;
pub mod routes;
pub mod schema;
pub mod session_state;
pub mod startup;
pub mod telemetry;
pub mod utils;
