//! User service.

use academy_common::{AppError, AppResult};
use academy_db::{entities::user, repositories::UserRepository};

/// Resolves API tokens to users.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self { user_repo }
    }

    /// Authenticate a user by token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        if token.is_empty() {
            return Err(AppError::Unauthorized);
        }
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn test_user(id: &str, token: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: format!("student-{id}"),
            token: token.to_string(),
            created_at: chrono::Utc::now().into(),
        }
    }

    fn service(db: MockDatabase) -> UserService {
        UserService::new(UserRepository::new(Arc::new(db.into_connection())))
    }

    #[tokio::test]
    async fn test_authenticate_by_token_found() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_user("u1", "tok")]]),
        );

        let user = service.authenticate_by_token("tok").await.unwrap();
        assert_eq!(user.id, "u1");
    }

    #[tokio::test]
    async fn test_authenticate_by_token_unknown() {
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        let err = service.authenticate_by_token("nope").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn test_authenticate_empty_token_skips_lookup() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));

        let err = service.authenticate_by_token("").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }
}
