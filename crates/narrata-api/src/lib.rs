//! Axum HTTP+WS intake API: accepts novel submissions, spawns the
//! generation pipeline in-process, and exposes polling and streaming
//! progress endpoints (spec §4.10).

pub mod cancellation;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod ws;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
