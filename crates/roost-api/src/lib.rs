pub mod app;
pub mod auth;
pub mod discovery;
pub mod error;
pub mod geocode;
pub mod images;
pub mod listings;
pub mod middleware;
pub mod reviews;
pub mod session;
pub mod state;
pub mod validate;

mod views;
