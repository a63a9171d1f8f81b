pub mod catalogue;
pub mod drafts;
pub mod menu;
pub mod moderation;
pub mod orders;
pub mod reservations;
pub mod restaurants;
pub mod statistics;
pub mod subscriptions;
pub mod user;
