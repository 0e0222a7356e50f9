//! Metrics collection for academy-rs.
//!
//! Counters for the enrollment lifecycle and for notification dispatch.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Global metrics instance.
static METRICS: std::sync::OnceLock<Arc<Metrics>> = std::sync::OnceLock::new();

/// Get the global metrics instance.
pub fn get_metrics() -> &'static Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new()))
}

/// Application metrics collector.
#[derive(Debug, Default)]
pub struct Metrics {
    // === Lifecycle Metrics ===
    /// Enrollments created
    pub enrollments_created: AtomicU64,
    /// Enrollment attempts rejected as duplicates
    pub enrollments_duplicate: AtomicU64,
    /// Lessons newly marked complete
    pub lessons_completed: AtomicU64,
    /// Enrollments that reached 100%
    pub courses_completed: AtomicU64,
    /// Progress writes that lost a version race and were re-applied
    pub progress_conflicts: AtomicU64,

    // === Dispatch Metrics ===
    /// Notifications written
    pub notifications_delivered: AtomicU64,
    /// Notifications abandoned after the last attempt
    pub notifications_failed: AtomicU64,
    /// Retries performed on transient failures
    pub notification_retries: AtomicU64,
    /// Notifications handed to the background worker
    pub notifications_queued: AtomicU64,
}

impl Metrics {
    /// Create a new metrics instance with all counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            enrollments_created: AtomicU64::new(0),
            enrollments_duplicate: AtomicU64::new(0),
            lessons_completed: AtomicU64::new(0),
            courses_completed: AtomicU64::new(0),
            progress_conflicts: AtomicU64::new(0),

            notifications_delivered: AtomicU64::new(0),
            notifications_failed: AtomicU64::new(0),
            notification_retries: AtomicU64::new(0),
            notifications_queued: AtomicU64::new(0),
        }
    }

    /// Record an enrollment attempt.
    pub fn record_enrollment(&self, created: bool) {
        if created {
            self.enrollments_created.fetch_add(1, Ordering::Relaxed);
        } else {
            self.enrollments_duplicate.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a newly completed lesson.
    pub fn record_lesson_completed(&self) {
        self.lessons_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a course reaching 100%.
    pub fn record_course_completed(&self) {
        self.courses_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lost compare-and-set on progress.
    pub fn record_progress_conflict(&self) {
        self.progress_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the final result of a notification write.
    pub fn record_notification(&self, delivered: bool) {
        if delivered {
            self.notifications_delivered.fetch_add(1, Ordering::Relaxed);
        } else {
            self.notifications_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a retry of a notification write.
    pub fn record_notification_retry(&self) {
        self.notification_retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a notification handed to the background worker.
    pub fn record_notification_queued(&self) {
        self.notifications_queued.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            enrollments_created: self.enrollments_created.load(Ordering::Relaxed),
            enrollments_duplicate: self.enrollments_duplicate.load(Ordering::Relaxed),
            lessons_completed: self.lessons_completed.load(Ordering::Relaxed),
            courses_completed: self.courses_completed.load(Ordering::Relaxed),
            progress_conflicts: self.progress_conflicts.load(Ordering::Relaxed),

            notifications_delivered: self.notifications_delivered.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
            notification_retries: self.notification_retries.load(Ordering::Relaxed),
            notifications_queued: self.notifications_queued.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let counters: [(&str, &str, u64); 9] = [
            ("academy_enrollments_created_total", "Enrollments created", snapshot.enrollments_created),
            ("academy_enrollments_duplicate_total", "Duplicate enrollment attempts", snapshot.enrollments_duplicate),
            ("academy_lessons_completed_total", "Lessons newly completed", snapshot.lessons_completed),
            ("academy_courses_completed_total", "Courses completed", snapshot.courses_completed),
            ("academy_progress_conflicts_total", "Progress version conflicts", snapshot.progress_conflicts),
            ("academy_notifications_delivered_total", "Notifications written", snapshot.notifications_delivered),
            ("academy_notifications_failed_total", "Notifications abandoned", snapshot.notifications_failed),
            ("academy_notification_retries_total", "Notification write retries", snapshot.notification_retries),
            ("academy_notifications_queued_total", "Notifications queued for background dispatch", snapshot.notifications_queued),
        ];

        let mut output = String::new();
        for (name, help, value) in counters {
            output.push_str(&format!("# HELP {name} {help}\n"));
            output.push_str(&format!("# TYPE {name} counter\n"));
            output.push_str(&format!("{name} {value}\n"));
        }
        output
    }
}

/// Point-in-time copy of all counters.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub enrollments_created: u64,
    pub enrollments_duplicate: u64,
    pub lessons_completed: u64,
    pub courses_completed: u64,
    pub progress_conflicts: u64,

    pub notifications_delivered: u64,
    pub notifications_failed: u64,
    pub notification_retries: u64,
    pub notifications_queued: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_counters() {
        let metrics = Metrics::new();

        metrics.record_enrollment(true);
        metrics.record_enrollment(false);
        metrics.record_lesson_completed();
        metrics.record_lesson_completed();
        metrics.record_notification(true);
        metrics.record_notification(false);
        metrics.record_notification_retry();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.enrollments_created, 1);
        assert_eq!(snapshot.enrollments_duplicate, 1);
        assert_eq!(snapshot.lessons_completed, 2);
        assert_eq!(snapshot.notifications_delivered, 1);
        assert_eq!(snapshot.notifications_failed, 1);
        assert_eq!(snapshot.notification_retries, 1);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = Metrics::new();
        metrics.record_course_completed();

        let output = metrics.to_prometheus();
        assert!(output.contains("# TYPE academy_courses_completed_total counter"));
        assert!(output.contains("academy_courses_completed_total 1"));
        assert!(output.contains("academy_enrollments_created_total 0"));
    }
}
