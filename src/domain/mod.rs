pub mod account_kind;
pub mod moderation;
pub mod order;
pub mod phone_number;
pub mod registration;
pub mod reservation;
pub mod statistics;
pub mod subscription;
pub mod user_email;
