//! Enrollment repository.

use std::sync::Arc;

use crate::entities::{Enrollment, enrollment};
use crate::is_unique_violation;
use academy_common::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    sea_query::Expr,
};

/// Enrollment repository for database operations.
#[derive(Clone)]
pub struct EnrollmentRepository {
    db: Arc<DatabaseConnection>,
}

impl EnrollmentRepository {
    /// Create a new enrollment repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an enrollment by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<enrollment::Model>> {
        Enrollment::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find the enrollment for a (student, course) pair.
    pub async fn find_by_student_and_course(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> AppResult<Option<enrollment::Model>> {
        Enrollment::find()
            .filter(enrollment::Column::StudentId.eq(student_id))
            .filter(enrollment::Column::CourseId.eq(course_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List a student's enrollments, newest first.
    pub async fn find_by_student(&self, student_id: &str) -> AppResult<Vec<enrollment::Model>> {
        Enrollment::find()
            .filter(enrollment::Column::StudentId.eq(student_id))
            .order_by_desc(enrollment::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a new enrollment.
    ///
    /// The unique `(student_id, course_id)` index decides races; a losing
    /// insert fails with [`AppError::DuplicateEnrollment`].
    pub async fn create(&self, model: enrollment::ActiveModel) -> AppResult<enrollment::Model> {
        let course_id = model.course_id.clone().take().unwrap_or_default();
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateEnrollment(course_id)
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Write a new completion set and progress if the row is still at `expected_version`.
    ///
    /// Bumps `version` and stamps `last_accessed`. Returns false when another
    /// writer got there first.
    pub async fn update_progress_if_version(
        &self,
        id: &str,
        expected_version: i32,
        completed_lessons: &[String],
        progress: i32,
        accessed_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = Enrollment::update_many()
            .col_expr(
                enrollment::Column::CompletedLessons,
                Expr::value(serde_json::json!(completed_lessons)),
            )
            .col_expr(enrollment::Column::Progress, Expr::value(progress))
            .col_expr(enrollment::Column::LastAccessed, Expr::value(accessed_at))
            .col_expr(
                enrollment::Column::Version,
                Expr::col(enrollment::Column::Version).add(1),
            )
            .filter(enrollment::Column::Id.eq(id))
            .filter(enrollment::Column::Version.eq(expected_version))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected == 1)
    }
}
