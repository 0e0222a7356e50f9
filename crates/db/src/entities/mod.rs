//! Database entities.

pub mod course;
pub mod enrollment;
pub mod lesson;
pub mod notification;
pub mod user;

pub use course::Entity as Course;
pub use enrollment::Entity as Enrollment;
pub use lesson::Entity as Lesson;
pub use notification::Entity as Notification;
pub use user::Entity as User;
