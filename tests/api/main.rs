mod authentication;
mod cache;
mod drafts;
mod health_check;
mod helpers;
mod moderation;
mod order;
mod reservation;
mod statistics;
mod subscription;
mod user_profile;
