//! Business logic services.

#![allow(missing_docs)]

pub mod catalog;
pub mod dispatch;
pub mod enrollment;
pub mod enrollment_store;
pub mod notification;
pub mod payment;
pub mod progress;
pub mod user;

pub use catalog::{CourseCatalog, CourseCatalogService, DbCourseCatalog};
pub use dispatch::{DispatchOutcome, DispatchWorker, NotificationDispatcher, NotificationRequest};
pub use enrollment::{EnrollmentService, LifecycleOutcome, ProgressView};
pub use enrollment_store::{
    DbEnrollmentStore, EnrollmentStore, EnrollmentStoreService, ProgressChange,
};
pub use notification::{NotificationService, NotificationSink, NotificationSinkService};
pub use payment::{PaymentVerifier, PaymentVerifierService, SessionIdVerifier};
pub use progress::{Milestone, ProgressSnapshot, compute_progress};
pub use user::UserService;
