pub mod auth;
pub mod error;
pub mod identity;
pub mod messages;
pub mod notifications;
pub mod posts;
pub mod rooms;
pub mod uploads;
pub mod users;
pub mod views;
