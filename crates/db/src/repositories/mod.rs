//! Repositories for database access.

pub mod course;
pub mod enrollment;
pub mod lesson;
pub mod notification;
pub mod user;

pub use course::CourseRepository;
pub use enrollment::EnrollmentRepository;
pub use lesson::LessonRepository;
pub use notification::NotificationRepository;
pub use user::UserRepository;
