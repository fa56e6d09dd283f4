//! The HTTP API: account auth, pic and schedule CRUD, uploads.

pub mod auth;
pub mod error;
pub mod pics;
pub mod routes;
pub mod schedules;
pub mod state;
pub mod users;

pub use {
    error::{ApiError, ApiResult},
    routes::{router, serve},
    state::{AppState, Notifier},
};
