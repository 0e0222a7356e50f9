//! Enrollment endpoints.

use academy_common::AppResult;
use academy_core::{DispatchOutcome, LifecycleOutcome, Milestone, ProgressView};
use academy_db::entities::{enrollment, notification::NotificationType};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Enrollment response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    pub id: String,
    pub student_id: String,
    pub course_id: String,
    pub completed_lessons: Vec<String>,
    pub progress: i32,
    pub enrolled_at: String,
    pub last_accessed: String,
}

impl From<enrollment::Model> for EnrollmentResponse {
    fn from(e: enrollment::Model) -> Self {
        Self {
            completed_lessons: e.completed_lesson_ids(),
            id: e.id,
            student_id: e.student_id,
            course_id: e.course_id,
            progress: e.progress,
            enrolled_at: e.enrolled_at.to_rfc3339(),
            last_accessed: e.last_accessed.to_rfc3339(),
        }
    }
}

/// Result of a mutating enrollment call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleResponse {
    pub enrollment: EnrollmentResponse,
    pub milestone: Milestone,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationType>,
    pub dispatch: DispatchOutcome,
}

impl From<LifecycleOutcome> for LifecycleResponse {
    fn from(outcome: LifecycleOutcome) -> Self {
        Self {
            enrollment: outcome.enrollment.into(),
            milestone: outcome.milestone,
            notification: outcome.emitted,
            dispatch: outcome.dispatch,
        }
    }
}

/// Enroll after checkout request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEnrollRequest {
    #[validate(length(min = 1, max = 64))]
    pub course_id: String,
    #[validate(length(min = 1, max = 256))]
    pub session_id: String,
}

/// Replace progress request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgressRequest {
    #[validate(length(max = 1000))]
    pub completed_lessons: Vec<String>,
}

/// Enrollment check response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledResponse {
    pub enrolled: bool,
}

fn respond(outcome: LifecycleOutcome) -> ApiResponse<LifecycleResponse> {
    if outcome.created {
        ApiResponse::created(outcome.into())
    } else {
        ApiResponse::ok(outcome.into())
    }
}

/// Enroll in a course.
async fn enroll(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> AppResult<ApiResponse<LifecycleResponse>> {
    let outcome = state.enrollment_service.enroll(&user.id, &course_id).await?;
    Ok(respond(outcome))
}

/// Enroll after a completed checkout. Safe to repeat.
async fn enroll_from_payment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<PaymentEnrollRequest>,
) -> AppResult<ApiResponse<LifecycleResponse>> {
    req.validate()?;

    let outcome = state
        .enrollment_service
        .enroll_from_payment(&user.id, &req.course_id, &req.session_id)
        .await?;
    Ok(respond(outcome))
}

/// Mark a lesson complete.
async fn complete_lesson(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path((course_id, lesson_id)): Path<(String, String)>,
) -> AppResult<ApiResponse<LifecycleResponse>> {
    let outcome = state
        .enrollment_service
        .complete_lesson(&user.id, &course_id, &lesson_id)
        .await?;
    Ok(respond(outcome))
}

/// Replace the set of completed lessons.
async fn update_progress(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(req): Json<UpdateProgressRequest>,
) -> AppResult<ApiResponse<LifecycleResponse>> {
    req.validate()?;

    let outcome = state
        .enrollment_service
        .bulk_update_progress(&user.id, &course_id, &req.completed_lessons)
        .await?;
    Ok(respond(outcome))
}

async fn is_enrolled(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> AppResult<ApiResponse<EnrolledResponse>> {
    let enrolled = state
        .enrollment_service
        .is_enrolled(&user.id, &course_id)
        .await?;
    Ok(ApiResponse::ok(EnrolledResponse { enrolled }))
}

async fn get_progress(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> AppResult<ApiResponse<ProgressView>> {
    let progress = state
        .enrollment_service
        .get_progress(&user.id, &course_id)
        .await?;
    Ok(ApiResponse::ok(progress))
}

async fn get_enrollment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> AppResult<ApiResponse<EnrollmentResponse>> {
    let enrollment = state
        .enrollment_service
        .get_enrollment(&user.id, &course_id)
        .await?;
    Ok(ApiResponse::ok(enrollment.into()))
}

/// List the authenticated student's enrollments, newest first.
async fn list_enrolled(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<EnrollmentResponse>>> {
    let enrollments = state.enrollment_service.list_enrolled(&user.id).await?;
    Ok(ApiResponse::ok(
        enrollments.into_iter().map(Into::into).collect(),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/payment/enroll", post(enroll_from_payment))
        .route("/user/enrolled", get(list_enrolled))
        .route("/{course_id}/enroll", post(enroll))
        .route(
            "/{course_id}/complete-lesson/{lesson_id}",
            post(complete_lesson),
        )
        .route("/{course_id}/progress", put(update_progress).get(get_progress))
        .route("/{course_id}/enrolled", get(is_enrolled))
        .route("/{course_id}/enrollment", get(get_enrollment))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_request_requires_session() {
        let req: PaymentEnrollRequest =
            serde_json::from_str(r#"{"courseId":"c1","sessionId":""}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_enrollment_response_exposes_lesson_ids() {
        let now = chrono::Utc::now();
        let model = enrollment::Model {
            id: "e1".to_string(),
            student_id: "s1".to_string(),
            course_id: "c1".to_string(),
            completed_lessons: serde_json::json!(["l1", "l2"]),
            progress: 50,
            enrolled_at: now.into(),
            last_accessed: now.into(),
            version: 2,
        };

        let json = serde_json::to_value(EnrollmentResponse::from(model)).unwrap();

        assert_eq!(json["completedLessons"], serde_json::json!(["l1", "l2"]));
        assert_eq!(json["progress"], 50);
        assert!(json.get("version").is_none());
    }
}
