//! Payment verification seam.
//!
//! Checkout runs outside this service. Enrollment from payment only needs to
//! know that a session id is acceptable before granting access.

use academy_common::{AppError, AppResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Confirms that a checkout session paid for a course.
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    /// Verify `session_id` for the given student and course.
    async fn verify(&self, session_id: &str, student_id: &str, course_id: &str) -> AppResult<()>;
}

/// Shared payment verifier handle.
pub type PaymentVerifierService = Arc<dyn PaymentVerifier>;

/// Accepts any non-blank session id.
///
/// Used when the checkout provider has already confirmed the session before
/// redirecting the student back.
#[derive(Clone, Default)]
pub struct SessionIdVerifier;

#[async_trait]
impl PaymentVerifier for SessionIdVerifier {
    async fn verify(&self, session_id: &str, student_id: &str, course_id: &str) -> AppResult<()> {
        if session_id.trim().is_empty() {
            tracing::warn!(
                student_id = %student_id,
                course_id = %course_id,
                "Rejected enrollment with blank payment session"
            );
            return Err(AppError::BadRequest(
                "Payment session id is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_accepts_session_id() {
        assert!(
            SessionIdVerifier
                .verify("cs_test_123", "s1", "c1")
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_rejects_blank_session_id() {
        let err = SessionIdVerifier.verify("   ", "s1", "c1").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
