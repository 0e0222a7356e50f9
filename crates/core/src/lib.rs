//! Core business logic for academy-rs.
//!
//! The enrollment lifecycle lives in [`EnrollmentService`], which composes a
//! [`CourseCatalog`], an [`EnrollmentStore`], the pure progress engine and a
//! [`NotificationDispatcher`].

pub mod services;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use services::*;
