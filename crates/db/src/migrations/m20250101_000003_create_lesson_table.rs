//! Create lesson table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Lesson::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Lesson::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Lesson::CourseId).string_len(32).not_null())
                    .col(ColumnDef::new(Lesson::Title).string_len(256).not_null())
                    .col(
                        ColumnDef::new(Lesson::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_lesson_course")
                            .from(Lesson::Table, Lesson::CourseId)
                            .to(Course::Table, Course::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (course_id, position) for ordered listing and counting
        manager
            .create_index(
                Index::create()
                    .name("idx_lesson_course_position")
                    .table(Lesson::Table)
                    .col(Lesson::CourseId)
                    .col(Lesson::Position)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Lesson::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Lesson {
    Table,
    Id,
    CourseId,
    Title,
    Position,
}

#[derive(Iden)]
enum Course {
    Table,
    Id,
}
