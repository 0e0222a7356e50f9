//! In-memory collaborators for exercising the enrollment lifecycle without a database.

#![allow(missing_docs)]

use academy_common::{AppError, AppResult, IdGenerator};
use academy_db::entities::notification::NotificationType;
use academy_db::entities::{course, enrollment, notification};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::services::catalog::CourseCatalog;
use crate::services::dispatch::{NotificationDispatcher, NotificationRequest};
use crate::services::enrollment::EnrollmentService;
use crate::services::enrollment_store::{
    EnrollmentStore, MAX_WRITE_ROUNDS, ProgressChange, dedup_lessons, newly_completed,
};
use crate::services::notification::NotificationSink;
use crate::services::payment::SessionIdVerifier;
use crate::services::progress;
use academy_common::RetryPolicy;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Catalog holding courses whose lessons are named `{course_id}-l{n}`.
#[derive(Default)]
pub struct InMemoryCatalog {
    courses: Mutex<HashMap<String, course::Model>>,
    lessons: Mutex<HashMap<String, String>>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a course with `lesson_count` lessons.
    #[must_use]
    pub fn with_course(self, course_id: &str, lesson_count: usize) -> Self {
        self.add_course(course_id, lesson_count);
        self
    }

    pub fn add_course(&self, course_id: &str, lesson_count: usize) {
        lock(&self.courses).insert(
            course_id.to_string(),
            course::Model {
                id: course_id.to_string(),
                title: format!("Course {course_id}"),
                enrollment_count: 0,
                created_at: Utc::now().into(),
            },
        );
        let mut lessons = lock(&self.lessons);
        for n in 1..=lesson_count {
            lessons.insert(lesson_id(course_id, n), course_id.to_string());
        }
    }

    /// Add one more lesson to an existing course.
    pub fn add_lesson(&self, course_id: &str, lesson_id: &str) {
        lock(&self.lessons).insert(lesson_id.to_string(), course_id.to_string());
    }
}

/// ID of the `n`th lesson of a course created by [`InMemoryCatalog`].
#[must_use]
pub fn lesson_id(course_id: &str, n: usize) -> String {
    format!("{course_id}-l{n}")
}

#[async_trait]
impl CourseCatalog for InMemoryCatalog {
    async fn find_course(&self, course_id: &str) -> AppResult<Option<course::Model>> {
        Ok(lock(&self.courses).get(course_id).cloned())
    }

    async fn lesson_belongs_to_course(&self, lesson_id: &str, course_id: &str) -> AppResult<bool> {
        Ok(lock(&self.lessons)
            .get(lesson_id)
            .is_some_and(|owner| owner == course_id))
    }

    async fn total_lessons(&self, course_id: &str) -> AppResult<u64> {
        Ok(lock(&self.lessons)
            .values()
            .filter(|owner| owner.as_str() == course_id)
            .count() as u64)
    }
}

/// Enrollment store over a map, with the same create and write semantics as
/// the database store.
#[derive(Default)]
pub struct InMemoryEnrollmentStore {
    enrollments: Mutex<HashMap<String, enrollment::Model>>,
    course_counters: Mutex<HashMap<String, u64>>,
    /// Versions to bump behind the writer's back, simulating lost races.
    interfering_writes: AtomicU32,
    id_gen: IdGenerator,
}

impl InMemoryEnrollmentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` compare-and-set writes lose their race.
    pub fn interfere(&self, count: u32) {
        self.interfering_writes.store(count, Ordering::SeqCst);
    }

    #[must_use]
    pub fn course_counter(&self, course_id: &str) -> u64 {
        lock(&self.course_counters)
            .get(course_id)
            .copied()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.enrollments).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write<F>(&self, enrollment_id: &str, total_lessons: u64, next: F) -> AppResult<ProgressChange>
    where
        F: Fn(&[String]) -> Option<Vec<String>>,
    {
        for _ in 0..MAX_WRITE_ROUNDS {
            let current = lock(&self.enrollments)
                .get(enrollment_id)
                .cloned()
                .ok_or_else(|| AppError::EnrollmentNotFound(enrollment_id.to_string()))?;
            let before = current.completed_lesson_ids();

            let Some(after) = next(&before) else {
                return Ok(ProgressChange {
                    previous_completed: before.len(),
                    enrollment: current,
                    newly_completed: Vec::new(),
                });
            };

            let mut enrollments = lock(&self.enrollments);
            let Some(stored) = enrollments.get_mut(enrollment_id) else {
                return Err(AppError::EnrollmentNotFound(enrollment_id.to_string()));
            };

            let interfering = self
                .interfering_writes
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if interfering {
                stored.version += 1;
            }
            if stored.version != current.version {
                continue;
            }

            stored.completed_lessons = serde_json::json!(after);
            stored.progress = progress::percentage(after.len(), total_lessons);
            stored.last_accessed = Utc::now().into();
            stored.version += 1;

            return Ok(ProgressChange {
                enrollment: stored.clone(),
                previous_completed: before.len(),
                newly_completed: newly_completed(&before, &after),
            });
        }

        Err(AppError::Conflict(format!(
            "Enrollment {enrollment_id} is being updated concurrently"
        )))
    }
}

#[async_trait]
impl EnrollmentStore for InMemoryEnrollmentStore {
    async fn find(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> AppResult<Option<enrollment::Model>> {
        Ok(lock(&self.enrollments)
            .values()
            .find(|e| e.student_id == student_id && e.course_id == course_id)
            .cloned())
    }

    async fn list_for_student(&self, student_id: &str) -> AppResult<Vec<enrollment::Model>> {
        let mut list: Vec<_> = lock(&self.enrollments)
            .values()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(list)
    }

    async fn create(&self, student_id: &str, course_id: &str) -> AppResult<enrollment::Model> {
        let mut enrollments = lock(&self.enrollments);
        if enrollments
            .values()
            .any(|e| e.student_id == student_id && e.course_id == course_id)
        {
            return Err(AppError::DuplicateEnrollment(course_id.to_string()));
        }

        let now = Utc::now();
        let model = enrollment::Model {
            id: self.id_gen.generate(),
            student_id: student_id.to_string(),
            course_id: course_id.to_string(),
            completed_lessons: serde_json::json!([]),
            progress: 0,
            enrolled_at: now.into(),
            last_accessed: now.into(),
            version: 0,
        };
        enrollments.insert(model.id.clone(), model.clone());
        Ok(model)
    }

    async fn add_completed_lesson(
        &self,
        enrollment_id: &str,
        lesson_id: &str,
        total_lessons: u64,
    ) -> AppResult<ProgressChange> {
        self.write(enrollment_id, total_lessons, |current| {
            if current.iter().any(|id| id == lesson_id) {
                return None;
            }
            let mut next = current.to_vec();
            next.push(lesson_id.to_string());
            Some(next)
        })
    }

    async fn set_completed_lessons(
        &self,
        enrollment_id: &str,
        lesson_ids: &[String],
        total_lessons: u64,
    ) -> AppResult<ProgressChange> {
        let lesson_ids = dedup_lessons(lesson_ids);
        self.write(enrollment_id, total_lessons, |_| Some(lesson_ids.clone()))
    }

    async fn increment_course_counter(&self, course_id: &str) -> AppResult<()> {
        *lock(&self.course_counters)
            .entry(course_id.to_string())
            .or_default() += 1;
        Ok(())
    }
}

/// Notification sink that fails with queued errors before succeeding, and
/// records every successful write.
#[derive(Default)]
pub struct FlakySink {
    failures: Mutex<VecDeque<AppError>>,
    always_fail: Option<fn() -> AppError>,
    attempts: AtomicU32,
    delivered: Mutex<Vec<NotificationRequest>>,
    id_gen: IdGenerator,
}

impl FlakySink {
    /// Fail with each of `errors` in turn, then succeed.
    #[must_use]
    pub fn failing_with(errors: Vec<AppError>) -> Self {
        Self {
            failures: Mutex::new(errors.into()),
            ..Self::default()
        }
    }

    /// Fail every attempt with the error `make` builds.
    #[must_use]
    pub fn always_failing(make: fn() -> AppError) -> Self {
        Self {
            always_fail: Some(make),
            ..Self::default()
        }
    }

    /// Calls made so far, successful or not.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn delivered(&self) -> Vec<NotificationRequest> {
        lock(&self.delivered).clone()
    }

    /// Delivered notification types, in order.
    #[must_use]
    pub fn delivered_types(&self) -> Vec<NotificationType> {
        lock(&self.delivered)
            .iter()
            .map(|r| r.notification_type)
            .collect()
    }
}

#[async_trait]
impl NotificationSink for FlakySink {
    async fn dispatch(
        &self,
        user_id: &str,
        notification_type: NotificationType,
        message: &str,
        course_id: Option<&str>,
    ) -> AppResult<notification::Model> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(make) = self.always_fail {
            return Err(make());
        }
        if let Some(error) = lock(&self.failures).pop_front() {
            return Err(error);
        }

        lock(&self.delivered).push(NotificationRequest {
            user_id: user_id.to_string(),
            notification_type,
            message: message.to_string(),
            course_id: course_id.map(ToString::to_string),
        });

        Ok(notification::Model {
            id: self.id_gen.generate(),
            user_id: user_id.to_string(),
            notification_type,
            message: message.to_string(),
            course_id: course_id.map(ToString::to_string),
            is_read: false,
            created_at: Utc::now().into(),
        })
    }
}

/// An [`EnrollmentService`] wired to in-memory collaborators with inline dispatch.
pub struct Harness {
    pub service: EnrollmentService,
    pub catalog: Arc<InMemoryCatalog>,
    pub store: Arc<InMemoryEnrollmentStore>,
    pub sink: Arc<FlakySink>,
}

impl Harness {
    /// Harness whose sink always succeeds.
    #[must_use]
    pub fn new(catalog: InMemoryCatalog) -> Self {
        Self::with_sink(catalog, FlakySink::default(), RetryPolicy::default())
    }

    #[must_use]
    pub fn with_sink(catalog: InMemoryCatalog, sink: FlakySink, policy: RetryPolicy) -> Self {
        let catalog = Arc::new(catalog);
        let store = Arc::new(InMemoryEnrollmentStore::new());
        let sink = Arc::new(sink);
        let service = EnrollmentService::new(
            store.clone(),
            catalog.clone(),
            Arc::new(SessionIdVerifier),
            NotificationDispatcher::inline(sink.clone(), policy),
        );

        Self {
            service,
            catalog,
            store,
            sink,
        }
    }
}
