//! API routes. Grounded on `vclip-api/src/routes.rs`'s route-group +
//! middleware-layering shape, trimmed to the spec's four-endpoint surface
//! (`upload`/`progress`/`cancel`/`stream`).

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers::health::health;
use crate::handlers::novels::{cancel, progress, upload};
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;
use crate::ws::stream;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let novel_routes = Router::new()
        .route("/api/v1/novels/upload", post(upload))
        .route("/api/v1/novels/:task_id/progress", get(progress))
        .route("/api/v1/novels/:task_id/cancel", post(cancel))
        .route("/api/v1/novels/:task_id/ws", get(stream));

    let health_routes = Router::new().route("/health", get(health)).route("/healthz", get(health));

    Router::new()
        .merge(novel_routes)
        .merge(health_routes)
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
