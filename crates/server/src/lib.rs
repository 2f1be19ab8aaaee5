//! HTTP surface of ogserver.
//!
//! This crate wires the cache policy engine to axum routes, hosts the
//! ephemeral template server, and runs the background sweeper.

pub mod error;
pub mod handlers;
pub mod policy;
pub mod routes;
pub mod state;
pub mod sweeper;
pub mod templates;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
