//! Lesson repository.

use std::sync::Arc;

use crate::entities::{Lesson, lesson};
use academy_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};

/// Lesson repository for database operations.
#[derive(Clone)]
pub struct LessonRepository {
    db: Arc<DatabaseConnection>,
}

impl LessonRepository {
    /// Create a new lesson repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a lesson by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<lesson::Model>> {
        Lesson::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// List lessons of a course in order.
    pub async fn find_by_course(&self, course_id: &str) -> AppResult<Vec<lesson::Model>> {
        Lesson::find()
            .filter(lesson::Column::CourseId.eq(course_id))
            .order_by_asc(lesson::Column::Position)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count lessons in a course.
    pub async fn count_by_course(&self, course_id: &str) -> AppResult<u64> {
        Lesson::find()
            .filter(lesson::Column::CourseId.eq(course_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new lesson.
    pub async fn create(&self, model: lesson::ActiveModel) -> AppResult<lesson::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_lesson(id: &str, course_id: &str, position: i32) -> lesson::Model {
        lesson::Model {
            id: id.to_string(),
            course_id: course_id.to_string(),
            title: format!("Lesson {position}"),
            position,
        }
    }

    #[tokio::test]
    async fn test_find_by_course() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[
                    create_test_lesson("l1", "c1", 1),
                    create_test_lesson("l2", "c1", 2),
                ]])
                .into_connection(),
        );

        let repo = LessonRepository::new(db);
        let lessons = repo.find_by_course("c1").await.unwrap();

        assert_eq!(lessons.len(), 2);
        assert_eq!(lessons[0].id, "l1");
        assert_eq!(lessons[1].position, 2);
    }

    #[tokio::test]
    async fn test_find_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<lesson::Model>::new()])
                .into_connection(),
        );

        let repo = LessonRepository::new(db);
        assert!(repo.find_by_id("nope").await.unwrap().is_none());
    }
}
