//! Course repository.

use std::sync::Arc;

use crate::entities::{Course, course};
use academy_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    sea_query::Expr,
};

/// Course repository for database operations.
#[derive(Clone)]
pub struct CourseRepository {
    db: Arc<DatabaseConnection>,
}

impl CourseRepository {
    /// Create a new course repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a course by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<course::Model>> {
        Course::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new course.
    pub async fn create(&self, model: course::ActiveModel) -> AppResult<course::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Increment the enrollment count atomically.
    pub async fn increment_enrollment_count(&self, id: &str) -> AppResult<()> {
        Course::update_many()
            .col_expr(
                course::Column::EnrollmentCount,
                Expr::col(course::Column::EnrollmentCount).add(1),
            )
            .filter(course::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    #[tokio::test]
    async fn test_find_by_id_found() {
        let course = course::Model {
            id: "c1".to_string(),
            title: "Rust for Beginners".to_string(),
            enrollment_count: 3,
            created_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[course]])
                .into_connection(),
        );

        let repo = CourseRepository::new(db);
        let found = repo.find_by_id("c1").await.unwrap().unwrap();

        assert_eq!(found.title, "Rust for Beginners");
        assert_eq!(found.enrollment_count, 3);
    }

    #[tokio::test]
    async fn test_increment_enrollment_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = CourseRepository::new(db);
        assert!(repo.increment_enrollment_count("c1").await.is_ok());
    }
}
