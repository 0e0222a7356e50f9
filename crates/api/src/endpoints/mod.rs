//! API endpoints.

mod enrollments;
mod metrics;
mod notifications;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/enrollments", enrollments::router())
        .nest("/notifications", notifications::router())
        .nest("/metrics", metrics::router())
}
