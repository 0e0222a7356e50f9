//! HTTP API layer for academy-rs.
//!
//! This crate exposes the enrollment lifecycle over REST:
//!
//! - **Endpoints**: enrollments, notifications, metrics
//! - **Extractors**: authenticated student
//! - **Middleware**: bearer token authentication
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

use axum::{Router, middleware::from_fn_with_state};

pub use endpoints::router;
pub use middleware::AppState;

/// The API router mounted under `/api` with authentication applied.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", router())
        .layer(from_fn_with_state(state.clone(), middleware::auth_middleware))
        .with_state(state)
}
