//! Notification service.

use academy_common::{AppError, AppResult, IdGenerator};
use academy_db::{
    entities::notification::{self, NotificationType},
    repositories::NotificationRepository,
};
use async_trait::async_trait;
use sea_orm::Set;
use std::sync::Arc;

/// Persists a single notification record.
///
/// Implementations do not retry; [`crate::NotificationDispatcher`] wraps
/// them in the retry policy.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Create a notification for `user_id`.
    async fn dispatch(
        &self,
        user_id: &str,
        notification_type: NotificationType,
        message: &str,
        course_id: Option<&str>,
    ) -> AppResult<notification::Model>;
}

/// Shared notification sink handle.
pub type NotificationSinkService = Arc<dyn NotificationSink>;

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(notification_repo: NotificationRepository) -> Self {
        Self {
            notification_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Get notifications for a user.
    pub async fn get_notifications(
        &self,
        user_id: &str,
        limit: u64,
        until_id: Option<&str>,
        unread_only: bool,
        types: Option<&[NotificationType]>,
    ) -> AppResult<Vec<notification::Model>> {
        self.notification_repo
            .find_by_user(user_id, limit, until_id, unread_only, types)
            .await
    }

    /// Mark a notification as read.
    pub async fn mark_as_read(&self, user_id: &str, notification_id: &str) -> AppResult<()> {
        if self
            .notification_repo
            .mark_as_read(notification_id, user_id)
            .await?
        {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Notification {notification_id}")))
        }
    }

    /// Mark all notifications as read for a user.
    pub async fn mark_all_as_read(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(user_id).await
    }

    /// Count unread notifications for a user.
    pub async fn count_unread(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(user_id).await
    }

    /// Delete a notification.
    pub async fn delete(&self, user_id: &str, notification_id: &str) -> AppResult<()> {
        if self
            .notification_repo
            .delete_for_user(notification_id, user_id)
            .await?
        {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Notification {notification_id}")))
        }
    }

    /// Delete all notifications for a user.
    pub async fn delete_all(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.delete_all_for_user(user_id).await
    }
}

#[async_trait]
impl NotificationSink for NotificationService {
    async fn dispatch(
        &self,
        user_id: &str,
        notification_type: NotificationType,
        message: &str,
        course_id: Option<&str>,
    ) -> AppResult<notification::Model> {
        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            notification_type: Set(notification_type),
            message: Set(message.to_string()),
            course_id: Set(course_id.map(ToString::to_string)),
            is_read: Set(false),
            created_at: Set(chrono::Utc::now().into()),
        };

        self.notification_repo.create(model).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn service(db: MockDatabase) -> NotificationService {
        NotificationService::new(NotificationRepository::new(Arc::new(db.into_connection())))
    }

    #[tokio::test]
    async fn test_dispatch_creates_unread_notification() {
        let stored = notification::Model {
            id: "n1".to_string(),
            user_id: "s1".to_string(),
            notification_type: NotificationType::CourseCompleted,
            message: "Course complete".to_string(),
            course_id: Some("c1".to_string()),
            is_read: false,
            created_at: chrono::Utc::now().into(),
        };
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[stored]]),
        );

        let created = service
            .dispatch("s1", NotificationType::CourseCompleted, "Course complete", Some("c1"))
            .await
            .unwrap();

        assert_eq!(created.user_id, "s1");
        assert!(!created.is_read);
    }

    #[tokio::test]
    async fn test_mark_as_read_not_owned() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            },
        ]));

        let err = service.mark_as_read("s2", "n1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_owned() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
        ]));

        assert!(service.delete("s1", "n1").await.is_ok());
    }
}
