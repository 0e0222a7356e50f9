//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `academy_test`)
//!   `TEST_DB_PASSWORD` (default: `academy_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use academy_common::AppError;
use academy_db::entities::enrollment;
use academy_db::repositories::{CourseRepository, EnrollmentRepository};
use academy_db::test_utils::{TestDatabase, TestDbConfig};
use chrono::Utc;
use sea_orm::{DatabaseConnection, Set};

fn new_enrollment(id: &str, student_id: &str, course_id: &str) -> enrollment::ActiveModel {
    let now = Utc::now();
    enrollment::ActiveModel {
        id: Set(id.to_string()),
        student_id: Set(student_id.to_string()),
        course_id: Set(course_id.to_string()),
        completed_lessons: Set(serde_json::json!([])),
        progress: Set(0),
        enrolled_at: Set(now.into()),
        last_accessed: Set(now.into()),
        version: Set(0),
    }
}

async fn seeded() -> (TestDatabase, Arc<DatabaseConnection>) {
    let db = TestDatabase::create_unique()
        .await
        .expect("Failed to create test database");
    db.seed_user("s1", "token-s1").await.unwrap();
    db.seed_course("c1", 4).await.unwrap();
    let conn = db.shared();
    (db, conn)
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_unique_pair_rejects_second_enrollment() {
    let (db, conn) = seeded().await;
    let repo = EnrollmentRepository::new(conn);

    repo.create(new_enrollment("e1", "s1", "c1")).await.unwrap();
    let err = repo
        .create(new_enrollment("e2", "s1", "c1"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::DuplicateEnrollment(id) if id == "c1"));
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_concurrent_inserts_create_one_row() {
    let (db, conn) = seeded().await;
    let repo = EnrollmentRepository::new(conn);

    let (a, b) = tokio::join!(
        repo.create(new_enrollment("e1", "s1", "c1")),
        repo.create(new_enrollment("e2", "s1", "c1")),
    );

    assert_eq!(usize::from(a.is_ok()) + usize::from(b.is_ok()), 1);
    assert_eq!(repo.find_by_student("s1").await.unwrap().len(), 1);
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_stale_version_write_is_refused() {
    let (db, conn) = seeded().await;
    let repo = EnrollmentRepository::new(conn);
    repo.create(new_enrollment("e1", "s1", "c1")).await.unwrap();

    let lessons = vec!["c1-l1".to_string()];
    assert!(
        repo.update_progress_if_version("e1", 0, &lessons, 25, Utc::now())
            .await
            .unwrap()
    );
    assert!(
        !repo
            .update_progress_if_version("e1", 0, &lessons, 25, Utc::now())
            .await
            .unwrap()
    );

    let stored = repo.find_by_id("e1").await.unwrap().unwrap();
    assert_eq!(stored.version, 1);
    assert_eq!(stored.progress, 25);
    assert_eq!(stored.completed_lesson_ids(), lessons);
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_progress_check_constraint() {
    let (db, conn) = seeded().await;
    let repo = EnrollmentRepository::new(conn);
    repo.create(new_enrollment("e1", "s1", "c1")).await.unwrap();

    let err = repo
        .update_progress_if_version("e1", 0, &[], 101, Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Database(_)));
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_enrollment_counter_increments_atomically() {
    let (db, conn) = seeded().await;
    let repo = CourseRepository::new(conn);

    let (a, b) = tokio::join!(
        repo.increment_enrollment_count("c1"),
        repo.increment_enrollment_count("c1"),
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(repo.find_by_id("c1").await.unwrap().unwrap().enrollment_count, 2);
    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_cleanup_empties_domain_tables() {
    let (db, conn) = seeded().await;
    let repo = EnrollmentRepository::new(conn.clone());
    repo.create(new_enrollment("e1", "s1", "c1")).await.unwrap();

    db.cleanup().await.unwrap();

    assert!(repo.find_by_student("s1").await.unwrap().is_empty());
    assert!(
        CourseRepository::new(conn)
            .find_by_id("c1")
            .await
            .unwrap()
            .is_none()
    );
    db.drop_database().await.unwrap();
}

#[test]
fn test_database_url_format() {
    let config = TestDbConfig {
        host: "testhost".to_string(),
        port: 5432,
        username: "testuser".to_string(),
        password: "testpass".to_string(),
        database: "testdb".to_string(),
    };

    let url = config.database_url();
    assert!(url.starts_with("postgres://"));
    assert!(url.contains("testhost:5432"));
    assert!(url.ends_with("/testdb"));
}

#[test]
fn test_postgres_url_format() {
    let config = TestDbConfig::default();
    let url = config.postgres_url();
    assert!(url.ends_with("/postgres"));
}
