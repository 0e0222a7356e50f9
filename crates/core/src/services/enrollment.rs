//! Enrollment lifecycle orchestration.
//!
//! Every mutating operation validates against the catalog, applies one store
//! write, derives the milestone from the progress engine and, only when a
//! milestone was reached, hands a notification to the dispatcher. Dispatch
//! problems are reported in [`LifecycleOutcome::dispatch`] and never undo the
//! committed write.

use academy_common::{AppError, AppResult, get_metrics};
use academy_db::entities::{course, enrollment, notification::NotificationType};
use serde::Serialize;
use tracing::{info, warn};

use crate::services::catalog::CourseCatalogService;
use crate::services::dispatch::{DispatchOutcome, NotificationDispatcher, NotificationRequest};
use crate::services::enrollment_store::{EnrollmentStoreService, ProgressChange, dedup_lessons};
use crate::services::payment::PaymentVerifierService;
use crate::services::progress::{Milestone, compute_progress, percentage};

/// Result of a lifecycle operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleOutcome {
    pub enrollment: enrollment::Model,
    /// Whether this call created the enrollment.
    pub created: bool,
    /// Milestone reached by this call.
    pub milestone: Milestone,
    /// Notification type emitted, if any.
    pub emitted: Option<NotificationType>,
    pub dispatch: DispatchOutcome,
}

/// Progress projection for one enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressView {
    pub progress: i32,
    pub completed_lessons: Vec<String>,
}

/// Enrollment service for business logic.
#[derive(Clone)]
pub struct EnrollmentService {
    store: EnrollmentStoreService,
    catalog: CourseCatalogService,
    payments: PaymentVerifierService,
    dispatcher: NotificationDispatcher,
}

impl EnrollmentService {
    /// Create a new enrollment service.
    #[must_use]
    pub const fn new(
        store: EnrollmentStoreService,
        catalog: CourseCatalogService,
        payments: PaymentVerifierService,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            store,
            catalog,
            payments,
            dispatcher,
        }
    }

    async fn require_course(&self, course_id: &str) -> AppResult<course::Model> {
        self.catalog
            .find_course(course_id)
            .await?
            .ok_or_else(|| AppError::CourseNotFound(course_id.to_string()))
    }

    async fn require_enrollment(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> AppResult<enrollment::Model> {
        self.store
            .find(student_id, course_id)
            .await?
            .ok_or_else(|| AppError::EnrollmentNotFound(course_id.to_string()))
    }

    /// Enroll a student in a course.
    pub async fn enroll(&self, student_id: &str, course_id: &str) -> AppResult<LifecycleOutcome> {
        let course = self.require_course(course_id).await?;

        let enrollment = match self.store.create(student_id, course_id).await {
            Ok(enrollment) => enrollment,
            Err(e) => {
                if matches!(e, AppError::DuplicateEnrollment(_)) {
                    get_metrics().record_enrollment(false);
                }
                return Err(e);
            }
        };

        Ok(self.finish_enrollment(enrollment, &course).await)
    }

    /// Enroll a student after checkout. Repeated calls return the existing
    /// enrollment without notifying again.
    pub async fn enroll_from_payment(
        &self,
        student_id: &str,
        course_id: &str,
        session_id: &str,
    ) -> AppResult<LifecycleOutcome> {
        let course = self.require_course(course_id).await?;
        self.payments
            .verify(session_id, student_id, course_id)
            .await?;

        if let Some(existing) = self.store.find(student_id, course_id).await? {
            return Ok(Self::unchanged(existing));
        }

        match self.store.create(student_id, course_id).await {
            Ok(enrollment) => Ok(self.finish_enrollment(enrollment, &course).await),
            // A concurrent call won the insert
            Err(AppError::DuplicateEnrollment(_)) => {
                let existing = self.require_enrollment(student_id, course_id).await?;
                Ok(Self::unchanged(existing))
            }
            Err(e) => Err(e),
        }
    }

    async fn finish_enrollment(
        &self,
        enrollment: enrollment::Model,
        course: &course::Model,
    ) -> LifecycleOutcome {
        get_metrics().record_enrollment(true);
        info!(
            student_id = %enrollment.student_id,
            course_id = %course.id,
            enrollment_id = %enrollment.id,
            "Student enrolled"
        );

        if let Err(e) = self.store.increment_course_counter(&course.id).await {
            warn!(course_id = %course.id, error = %e, "Failed to bump enrollment counter");
        }

        let dispatch = self
            .dispatcher
            .dispatch(NotificationRequest::for_course(
                &enrollment.student_id,
                NotificationType::Enrollment,
                format!("You are now enrolled in {}", course.title),
                &course.id,
            ))
            .await;

        LifecycleOutcome {
            enrollment,
            created: true,
            milestone: Milestone::None,
            emitted: Some(NotificationType::Enrollment),
            dispatch,
        }
    }

    fn unchanged(enrollment: enrollment::Model) -> LifecycleOutcome {
        LifecycleOutcome {
            enrollment,
            created: false,
            milestone: Milestone::None,
            emitted: None,
            dispatch: DispatchOutcome::Skipped,
        }
    }

    /// Mark one lesson complete. Completing a lesson twice changes nothing.
    pub async fn complete_lesson(
        &self,
        student_id: &str,
        course_id: &str,
        lesson_id: &str,
    ) -> AppResult<LifecycleOutcome> {
        let enrollment = self.require_enrollment(student_id, course_id).await?;

        if !self
            .catalog
            .lesson_belongs_to_course(lesson_id, course_id)
            .await?
        {
            return Err(AppError::InvalidLesson(lesson_id.to_string()));
        }

        let total = self.catalog.total_lessons(course_id).await?;
        let change = self
            .store
            .add_completed_lesson(&enrollment.id, lesson_id, total)
            .await?;

        let just_added = !change.newly_completed.is_empty();
        let milestone = compute_progress(change.completed_count(), total, just_added).milestone;

        Ok(self.finish_progress(change, milestone).await)
    }

    /// Replace the completion set wholesale.
    ///
    /// Every lesson must belong to the course. A notification is sent only if
    /// the new set contains a lesson the old one did not; COURSE_COMPLETED
    /// replaces LESSON_COMPLETED when this write took progress to 100.
    pub async fn bulk_update_progress(
        &self,
        student_id: &str,
        course_id: &str,
        lesson_ids: &[String],
    ) -> AppResult<LifecycleOutcome> {
        let enrollment = self.require_enrollment(student_id, course_id).await?;

        let lesson_ids = dedup_lessons(lesson_ids);
        for lesson_id in &lesson_ids {
            if !self
                .catalog
                .lesson_belongs_to_course(lesson_id, course_id)
                .await?
            {
                return Err(AppError::InvalidLesson(lesson_id.clone()));
            }
        }

        let total = self.catalog.total_lessons(course_id).await?;
        let change = self
            .store
            .set_completed_lessons(&enrollment.id, &lesson_ids, total)
            .await?;

        // The stored progress may predate lessons added to the course, so the
        // previous state is measured against the current total
        let net_new = !change.newly_completed.is_empty();
        let was_complete = percentage(change.previous_completed, total) == 100;
        let milestone = match compute_progress(change.completed_count(), total, net_new).milestone
        {
            Milestone::CourseComplete if was_complete => Milestone::LessonComplete,
            milestone => milestone,
        };

        Ok(self.finish_progress(change, milestone).await)
    }

    async fn finish_progress(&self, change: ProgressChange, milestone: Milestone) -> LifecycleOutcome {
        let metrics = get_metrics();
        for _ in &change.newly_completed {
            metrics.record_lesson_completed();
        }

        let enrollment = change.enrollment;
        let emitted = match milestone {
            Milestone::None => None,
            Milestone::LessonComplete => Some((
                NotificationType::LessonCompleted,
                format!("Lesson completed. You are {}% through the course", enrollment.progress),
            )),
            Milestone::CourseComplete => {
                metrics.record_course_completed();
                info!(
                    student_id = %enrollment.student_id,
                    course_id = %enrollment.course_id,
                    "Course completed"
                );
                Some((
                    NotificationType::CourseCompleted,
                    "Congratulations! You have completed the course".to_string(),
                ))
            }
        };

        let (emitted, dispatch) = match emitted {
            Some((notification_type, message)) => {
                let dispatch = self
                    .dispatcher
                    .dispatch(NotificationRequest::for_course(
                        &enrollment.student_id,
                        notification_type,
                        message,
                        &enrollment.course_id,
                    ))
                    .await;
                (Some(notification_type), dispatch)
            }
            None => (None, DispatchOutcome::Skipped),
        };

        LifecycleOutcome {
            enrollment,
            created: false,
            milestone,
            emitted,
            dispatch,
        }
    }

    /// Whether the student is enrolled in the course.
    pub async fn is_enrolled(&self, student_id: &str, course_id: &str) -> AppResult<bool> {
        Ok(self.store.find(student_id, course_id).await?.is_some())
    }

    /// Progress for the student's enrollment in the course.
    pub async fn get_progress(&self, student_id: &str, course_id: &str) -> AppResult<ProgressView> {
        let enrollment = self.require_enrollment(student_id, course_id).await?;
        Ok(ProgressView {
            progress: enrollment.progress,
            completed_lessons: enrollment.completed_lesson_ids(),
        })
    }

    /// The student's enrollment in the course.
    pub async fn get_enrollment(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> AppResult<enrollment::Model> {
        self.require_enrollment(student_id, course_id).await
    }

    /// All of the student's enrollments, newest first.
    pub async fn list_enrolled(&self, student_id: &str) -> AppResult<Vec<enrollment::Model>> {
        self.store.list_for_student(student_id).await
    }
}
