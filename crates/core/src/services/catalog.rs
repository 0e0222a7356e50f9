//! Course and lesson reference lookups.
//!
//! The catalog is owned elsewhere; the enrollment lifecycle only asks these
//! read-only questions of it.

use academy_common::AppResult;
use academy_db::entities::course;
use academy_db::repositories::{CourseRepository, LessonRepository};
use async_trait::async_trait;
use std::sync::Arc;

/// Read-only view of courses and their lessons.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    /// Look up a course.
    async fn find_course(&self, course_id: &str) -> AppResult<Option<course::Model>>;

    /// Whether `lesson_id` exists and belongs to `course_id`.
    async fn lesson_belongs_to_course(&self, lesson_id: &str, course_id: &str) -> AppResult<bool>;

    /// Current number of lessons in the course.
    async fn total_lessons(&self, course_id: &str) -> AppResult<u64>;
}

/// Shared catalog handle.
pub type CourseCatalogService = Arc<dyn CourseCatalog>;

/// Catalog backed by the course and lesson tables.
#[derive(Clone)]
pub struct DbCourseCatalog {
    course_repo: CourseRepository,
    lesson_repo: LessonRepository,
}

impl DbCourseCatalog {
    /// Create a new database-backed catalog.
    #[must_use]
    pub const fn new(course_repo: CourseRepository, lesson_repo: LessonRepository) -> Self {
        Self {
            course_repo,
            lesson_repo,
        }
    }
}

#[async_trait]
impl CourseCatalog for DbCourseCatalog {
    async fn find_course(&self, course_id: &str) -> AppResult<Option<course::Model>> {
        self.course_repo.find_by_id(course_id).await
    }

    async fn lesson_belongs_to_course(&self, lesson_id: &str, course_id: &str) -> AppResult<bool> {
        Ok(self
            .lesson_repo
            .find_by_id(lesson_id)
            .await?
            .is_some_and(|lesson| lesson.course_id == course_id))
    }

    async fn total_lessons(&self, course_id: &str) -> AppResult<u64> {
        self.lesson_repo.count_by_course(course_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use academy_db::entities::lesson;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn catalog_with_lessons(lessons: Vec<lesson::Model>) -> DbCourseCatalog {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([lessons])
                .into_connection(),
        );
        DbCourseCatalog::new(CourseRepository::new(db.clone()), LessonRepository::new(db))
    }

    fn lesson(id: &str, course_id: &str) -> lesson::Model {
        lesson::Model {
            id: id.to_string(),
            course_id: course_id.to_string(),
            title: "Ownership".to_string(),
            position: 1,
        }
    }

    #[tokio::test]
    async fn test_lesson_in_course() {
        let catalog = catalog_with_lessons(vec![lesson("l1", "c1")]);
        assert!(catalog.lesson_belongs_to_course("l1", "c1").await.unwrap());
    }

    #[tokio::test]
    async fn test_lesson_in_other_course() {
        let catalog = catalog_with_lessons(vec![lesson("l1", "c2")]);
        assert!(!catalog.lesson_belongs_to_course("l1", "c1").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_lesson() {
        let catalog = catalog_with_lessons(vec![]);
        assert!(!catalog.lesson_belongs_to_course("nope", "c1").await.unwrap());
    }
}
