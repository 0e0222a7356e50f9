//! Enrollment entity (a student's membership in a course).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "enrollment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The enrolled student
    pub student_id: String,

    /// The course enrolled in
    pub course_id: String,

    /// Completed lesson IDs, as a JSON array without duplicates
    #[sea_orm(column_type = "JsonBinary")]
    pub completed_lessons: Json,

    /// Percentage in [0, 100]
    #[sea_orm(default_value = 0)]
    pub progress: i32,

    pub enrolled_at: DateTimeWithTimeZone,

    pub last_accessed: DateTimeWithTimeZone,

    /// Revision for compare-and-set progress writes
    #[sea_orm(default_value = 0)]
    pub version: i32,
}

impl Model {
    /// Completed lesson IDs. Malformed stored values read as empty.
    #[must_use]
    pub fn completed_lesson_ids(&self) -> Vec<String> {
        serde_json::from_value(self.completed_lessons.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::StudentId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Student,

    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id",
        on_delete = "Cascade"
    )]
    Course,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
