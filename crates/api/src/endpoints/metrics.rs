//! Metrics endpoints for monitoring and observability.
//!
//! Provides endpoints for:
//! - JSON counters
//! - Prometheus metrics export
//! - Health checks

use academy_common::metrics::{MetricsSnapshot, get_metrics};
use axum::{
    Json, Router,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;

use crate::middleware::AppState;

/// Create the metrics router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_metrics_json))
        .route("/prometheus", get(get_metrics_prometheus))
        .route("/health", get(health_check))
}

/// JSON metrics response.
#[derive(Serialize)]
pub struct MetricsResponse {
    pub enrollment: EnrollmentMetrics,
    pub dispatch: DispatchMetrics,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentMetrics {
    pub created: u64,
    pub duplicates: u64,
    pub lessons_completed: u64,
    pub courses_completed: u64,
    pub progress_conflicts: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchMetrics {
    pub delivered: u64,
    pub failed: u64,
    pub retries: u64,
    pub queued: u64,
}

impl From<MetricsSnapshot> for MetricsResponse {
    fn from(s: MetricsSnapshot) -> Self {
        Self {
            enrollment: EnrollmentMetrics {
                created: s.enrollments_created,
                duplicates: s.enrollments_duplicate,
                lessons_completed: s.lessons_completed,
                courses_completed: s.courses_completed,
                progress_conflicts: s.progress_conflicts,
            },
            dispatch: DispatchMetrics {
                delivered: s.notifications_delivered,
                failed: s.notifications_failed,
                retries: s.notification_retries,
                queued: s.notifications_queued,
            },
        }
    }
}

/// Get metrics in JSON format.
async fn get_metrics_json() -> Json<MetricsResponse> {
    Json(MetricsResponse::from(get_metrics().snapshot()))
}

/// Get metrics in Prometheus text format.
async fn get_metrics_prometheus() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        get_metrics().to_prometheus(),
    )
        .into_response()
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Simple health check (liveness probe).
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_response_from_snapshot() {
        let snapshot = MetricsSnapshot {
            enrollments_created: 12,
            enrollments_duplicate: 2,
            lessons_completed: 40,
            courses_completed: 3,
            progress_conflicts: 1,
            notifications_delivered: 50,
            notifications_failed: 4,
            notification_retries: 9,
            notifications_queued: 0,
        };

        let response = MetricsResponse::from(snapshot);

        assert_eq!(response.enrollment.created, 12);
        assert_eq!(response.enrollment.courses_completed, 3);
        assert_eq!(response.dispatch.failed, 4);
        assert_eq!(response.dispatch.retries, 9);
    }
}
