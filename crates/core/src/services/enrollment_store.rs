//! Enrollment store.
//!
//! Owns the enrollment rows. Creation relies on the unique `(student, course)`
//! index; progress writes are compare-and-set on the row's `version`.

use academy_common::{AppError, AppResult, IdGenerator, get_metrics};
use academy_db::entities::enrollment;
use academy_db::repositories::{CourseRepository, EnrollmentRepository};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::Set;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::services::progress;

/// Compare-and-set rounds before a progress write gives up with `Conflict`.
pub const MAX_WRITE_ROUNDS: usize = 5;

/// Result of a progress write.
#[derive(Debug, Clone)]
pub struct ProgressChange {
    /// The enrollment as stored after the write.
    pub enrollment: enrollment::Model,
    /// Size of the completion set before the write.
    pub previous_completed: usize,
    /// Lessons present after the write that were absent before.
    pub newly_completed: Vec<String>,
}

impl ProgressChange {
    /// Number of completed lessons after the write.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.enrollment.completed_lesson_ids().len()
    }
}

/// Persistence for enrollments.
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    /// Find the enrollment for a (student, course) pair.
    async fn find(&self, student_id: &str, course_id: &str)
    -> AppResult<Option<enrollment::Model>>;

    /// A student's enrollments, newest first.
    async fn list_for_student(&self, student_id: &str) -> AppResult<Vec<enrollment::Model>>;

    /// Create an enrollment at 0%. Fails with `DuplicateEnrollment` if the pair exists.
    async fn create(&self, student_id: &str, course_id: &str) -> AppResult<enrollment::Model>;

    /// Add `lesson_id` to the completion set if absent and recompute progress
    /// against `total_lessons`. Adding a lesson already in the set writes nothing.
    async fn add_completed_lesson(
        &self,
        enrollment_id: &str,
        lesson_id: &str,
        total_lessons: u64,
    ) -> AppResult<ProgressChange>;

    /// Replace the completion set and recompute progress against `total_lessons`.
    async fn set_completed_lessons(
        &self,
        enrollment_id: &str,
        lesson_ids: &[String],
        total_lessons: u64,
    ) -> AppResult<ProgressChange>;

    /// Bump the course's denormalized enrollment counter.
    async fn increment_course_counter(&self, course_id: &str) -> AppResult<()>;
}

/// Shared enrollment store handle.
pub type EnrollmentStoreService = Arc<dyn EnrollmentStore>;

/// Remove duplicates, keeping first occurrences in order.
#[must_use]
pub fn dedup_lessons(lesson_ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(lesson_ids.len());
    lesson_ids
        .iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Lessons in `after` that are not in `before`.
#[must_use]
pub fn newly_completed(before: &[String], after: &[String]) -> Vec<String> {
    let before: HashSet<&str> = before.iter().map(String::as_str).collect();
    after
        .iter()
        .filter(|id| !before.contains(id.as_str()))
        .cloned()
        .collect()
}

/// Enrollment store backed by the enrollment and course tables.
#[derive(Clone)]
pub struct DbEnrollmentStore {
    enrollment_repo: EnrollmentRepository,
    course_repo: CourseRepository,
    id_gen: IdGenerator,
}

impl DbEnrollmentStore {
    /// Create a new database-backed store.
    #[must_use]
    pub const fn new(enrollment_repo: EnrollmentRepository, course_repo: CourseRepository) -> Self {
        Self {
            enrollment_repo,
            course_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Read-modify-write loop shared by both progress mutations.
    ///
    /// `next` maps the current completion set to the new one, or `None` when
    /// nothing should be written.
    async fn write_progress<F>(
        &self,
        enrollment_id: &str,
        total_lessons: u64,
        next: F,
    ) -> AppResult<ProgressChange>
    where
        F: Fn(&[String]) -> Option<Vec<String>> + Send + Sync,
    {
        for round in 0..MAX_WRITE_ROUNDS {
            let current = self
                .enrollment_repo
                .find_by_id(enrollment_id)
                .await?
                .ok_or_else(|| AppError::EnrollmentNotFound(enrollment_id.to_string()))?;
            let before = current.completed_lesson_ids();

            let Some(after) = next(&before) else {
                return Ok(ProgressChange {
                    previous_completed: before.len(),
                    enrollment: current,
                    newly_completed: Vec::new(),
                });
            };

            let progress = progress::percentage(after.len(), total_lessons);
            let now = Utc::now();
            let applied = self
                .enrollment_repo
                .update_progress_if_version(enrollment_id, current.version, &after, progress, now)
                .await?;

            if applied {
                let newly_completed = newly_completed(&before, &after);
                let enrollment = enrollment::Model {
                    completed_lessons: serde_json::json!(after),
                    progress,
                    last_accessed: now.into(),
                    version: current.version + 1,
                    ..current
                };
                return Ok(ProgressChange {
                    enrollment,
                    previous_completed: before.len(),
                    newly_completed,
                });
            }

            get_metrics().record_progress_conflict();
            debug!(
                enrollment_id = %enrollment_id,
                round = round,
                "Progress write lost a version race, re-reading"
            );
        }

        Err(AppError::Conflict(format!(
            "Enrollment {enrollment_id} is being updated concurrently"
        )))
    }
}

#[async_trait]
impl EnrollmentStore for DbEnrollmentStore {
    async fn find(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> AppResult<Option<enrollment::Model>> {
        self.enrollment_repo
            .find_by_student_and_course(student_id, course_id)
            .await
    }

    async fn list_for_student(&self, student_id: &str) -> AppResult<Vec<enrollment::Model>> {
        self.enrollment_repo.find_by_student(student_id).await
    }

    async fn create(&self, student_id: &str, course_id: &str) -> AppResult<enrollment::Model> {
        let now = Utc::now();
        let model = enrollment::ActiveModel {
            id: Set(self.id_gen.generate()),
            student_id: Set(student_id.to_string()),
            course_id: Set(course_id.to_string()),
            completed_lessons: Set(serde_json::json!([])),
            progress: Set(0),
            enrolled_at: Set(now.into()),
            last_accessed: Set(now.into()),
            version: Set(0),
        };

        self.enrollment_repo.create(model).await
    }

    async fn add_completed_lesson(
        &self,
        enrollment_id: &str,
        lesson_id: &str,
        total_lessons: u64,
    ) -> AppResult<ProgressChange> {
        self.write_progress(enrollment_id, total_lessons, |current| {
            if current.iter().any(|id| id == lesson_id) {
                return None;
            }
            let mut next = current.to_vec();
            next.push(lesson_id.to_string());
            Some(next)
        })
        .await
    }

    async fn set_completed_lessons(
        &self,
        enrollment_id: &str,
        lesson_ids: &[String],
        total_lessons: u64,
    ) -> AppResult<ProgressChange> {
        let lesson_ids = dedup_lessons(lesson_ids);
        self.write_progress(enrollment_id, total_lessons, |_| Some(lesson_ids.clone()))
            .await
    }

    async fn increment_course_counter(&self, course_id: &str) -> AppResult<()> {
        self.course_repo.increment_enrollment_count(course_id).await
    }
}
