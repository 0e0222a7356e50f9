//! Notification dispatch with retry.
//!
//! Milestone notifications are written through the [`RetryPolicy`] either
//! inline, inside the request that produced them, or by a background worker
//! pool fed over a bounded channel. Failures never propagate to the caller;
//! they come back as a [`DispatchOutcome`].

use academy_common::config::{DispatchConfig, DispatchMode};
use academy_common::{RetryPolicy, get_metrics};
use academy_db::entities::notification::NotificationType;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::services::notification::NotificationSinkService;

/// A notification waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub user_id: String,
    pub notification_type: NotificationType,
    pub message: String,
    pub course_id: Option<String>,
}

impl NotificationRequest {
    /// Build a request about a course.
    #[must_use]
    pub fn for_course(
        user_id: &str,
        notification_type: NotificationType,
        message: impl Into<String>,
        course_id: &str,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            notification_type,
            message: message.into(),
            course_id: Some(course_id.to_string()),
        }
    }
}

/// What happened to a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DispatchOutcome {
    /// Written on attempt `attempts`.
    #[serde(rename_all = "camelCase")]
    Delivered {
        notification_id: String,
        attempts: u32,
    },
    /// Abandoned after `attempts` attempts. Zero attempts means it never
    /// reached the sink.
    Failed { attempts: u32, error: String },
    /// Handed to the background worker.
    Queued,
    /// No milestone, nothing to send.
    Skipped,
}

/// Write one notification through the retry policy, logging and metering the result.
pub async fn deliver(
    sink: &NotificationSinkService,
    policy: &RetryPolicy,
    request: &NotificationRequest,
) -> DispatchOutcome {
    let metrics = get_metrics();

    let result = policy
        .run_observed(
            |attempt| async move {
                sink.dispatch(
                    &request.user_id,
                    request.notification_type,
                    &request.message,
                    request.course_id.as_deref(),
                )
                .await
                .map(|notification| (notification, attempt))
            },
            |_, _| metrics.record_notification_retry(),
        )
        .await;

    match result {
        Ok((notification, attempts)) => {
            metrics.record_notification(true);
            debug!(
                user_id = %request.user_id,
                notification_id = %notification.id,
                notification_type = ?request.notification_type,
                attempts = attempts,
                "Notification delivered"
            );
            DispatchOutcome::Delivered {
                notification_id: notification.id,
                attempts,
            }
        }
        Err(failure) => {
            metrics.record_notification(false);
            error!(
                user_id = %request.user_id,
                notification_type = ?request.notification_type,
                attempts = failure.attempts,
                error = %failure.error,
                "Notification dispatch failed"
            );
            DispatchOutcome::Failed {
                attempts: failure.attempts,
                error: failure.error.to_string(),
            }
        }
    }
}

/// Sends milestone notifications according to the configured mode.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sink: NotificationSinkService,
    policy: RetryPolicy,
    queue: Option<mpsc::Sender<NotificationRequest>>,
}

impl NotificationDispatcher {
    /// Dispatcher that retries inside the caller's request.
    #[must_use]
    pub const fn inline(sink: NotificationSinkService, policy: RetryPolicy) -> Self {
        Self {
            sink,
            policy,
            queue: None,
        }
    }

    /// Dispatcher that hands requests to a worker pool.
    ///
    /// The returned [`DispatchWorker`] must be started for queued requests
    /// to be written.
    #[must_use]
    pub fn background(
        sink: NotificationSinkService,
        policy: RetryPolicy,
        workers: usize,
        queue_capacity: usize,
    ) -> (Self, DispatchWorker) {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let worker = DispatchWorker {
            receiver,
            sink: sink.clone(),
            policy,
            workers: workers.max(1),
        };
        let dispatcher = Self {
            sink,
            policy,
            queue: Some(sender),
        };
        (dispatcher, worker)
    }

    /// Build a dispatcher from configuration.
    #[must_use]
    pub fn from_config(
        sink: NotificationSinkService,
        config: &DispatchConfig,
    ) -> (Self, Option<DispatchWorker>) {
        let policy = config.retry_policy();
        match config.mode {
            DispatchMode::Inline => (Self::inline(sink, policy), None),
            DispatchMode::Background => {
                let (dispatcher, worker) =
                    Self::background(sink, policy, config.workers, config.queue_capacity);
                (dispatcher, Some(worker))
            }
        }
    }

    /// Send a notification. Never fails; the outcome says what happened.
    pub async fn dispatch(&self, request: NotificationRequest) -> DispatchOutcome {
        let Some(ref queue) = self.queue else {
            return deliver(&self.sink, &self.policy, &request).await;
        };

        match queue.try_send(request) {
            Ok(()) => {
                get_metrics().record_notification_queued();
                DispatchOutcome::Queued
            }
            Err(e) => {
                let reason = match e {
                    mpsc::error::TrySendError::Full(_) => "Dispatch queue is full",
                    mpsc::error::TrySendError::Closed(_) => "Dispatch worker is not running",
                };
                get_metrics().record_notification(false);
                warn!(reason = reason, "Failed to enqueue notification");
                DispatchOutcome::Failed {
                    attempts: 0,
                    error: reason.to_string(),
                }
            }
        }
    }
}

/// Background consumer for queued notifications.
pub struct DispatchWorker {
    receiver: mpsc::Receiver<NotificationRequest>,
    sink: NotificationSinkService,
    policy: RetryPolicy,
    workers: usize,
}

impl DispatchWorker {
    /// Spawn the worker loop. It stops once every dispatcher clone is dropped
    /// and the queue has drained.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("Dispatch worker starting with {} workers", self.workers);
            self.run().await;
            info!("Dispatch worker stopped");
        })
    }

    async fn run(self) {
        let Self {
            mut receiver,
            sink,
            policy,
            workers,
        } = self;
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut in_flight = Vec::new();

        while let Some(request) = receiver.recv().await {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let sink = sink.clone();

            in_flight.retain(|handle: &JoinHandle<()>| !handle.is_finished());
            in_flight.push(tokio::spawn(async move {
                let _permit = permit;
                deliver(&sink, &policy, &request).await;
            }));
        }

        for handle in in_flight {
            if let Err(e) = handle.await {
                error!(error = %e, "Dispatch task panicked");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::FlakySink;
    use academy_common::AppError;
    use std::time::Duration;

    fn request() -> NotificationRequest {
        NotificationRequest::for_course("s1", NotificationType::LessonCompleted, "Lesson done", "c1")
    }

    #[tokio::test(start_paused = true)]
    async fn test_inline_retries_rate_limit_then_delivers() {
        let sink = Arc::new(FlakySink::failing_with(vec![
            AppError::RateLimited,
            AppError::ExternalService("429".to_string()),
        ]));
        let dispatcher = NotificationDispatcher::inline(
            sink.clone(),
            RetryPolicy::new(3, Duration::from_millis(1000)),
        );

        let outcome = dispatcher.dispatch(request()).await;

        assert!(matches!(outcome, DispatchOutcome::Delivered { .. }));
        assert_eq!(sink.attempts(), 3);
        assert_eq!(sink.delivered().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inline_gives_up_on_permanent_error() {
        let sink = Arc::new(FlakySink::failing_with(vec![AppError::Database(
            "disk full".to_string(),
        )]));
        let dispatcher = NotificationDispatcher::inline(sink.clone(), RetryPolicy::default());

        let outcome = dispatcher.dispatch(request()).await;

        assert_eq!(
            outcome,
            DispatchOutcome::Failed {
                attempts: 1,
                error: "Database error: disk full".to_string(),
            }
        );
        assert!(sink.delivered().is_empty());
    }

    #[tokio::test]
    async fn test_background_delivers_after_queueing() {
        let sink = Arc::new(FlakySink::default());
        let (dispatcher, worker) =
            NotificationDispatcher::background(sink.clone(), RetryPolicy::default(), 2, 8);
        let handle = worker.start();

        let outcome = dispatcher.dispatch(request()).await;
        assert_eq!(outcome, DispatchOutcome::Queued);

        drop(dispatcher);
        handle.await.unwrap();

        assert_eq!(sink.delivered(), vec![request()]);
    }

    #[tokio::test]
    async fn test_background_full_queue_reports_failure() {
        let sink = Arc::new(FlakySink::default());
        let (dispatcher, _worker) =
            NotificationDispatcher::background(sink, RetryPolicy::default(), 1, 1);

        assert_eq!(dispatcher.dispatch(request()).await, DispatchOutcome::Queued);
        let outcome = dispatcher.dispatch(request()).await;

        assert!(matches!(outcome, DispatchOutcome::Failed { attempts: 0, .. }));
    }
}
