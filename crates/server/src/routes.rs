//! Route configuration.

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::help))
        .route("/help", get(handlers::help))
        .route("/capture", get(handlers::capture))
        // historical alias of /capture
        .route("/get", get(handlers::capture))
        .route("/template/{template}", get(handlers::template))
        .route("/template/{template}/", get(handlers::template))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
