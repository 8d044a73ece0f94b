use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Subject::Table)
                    .if_not_exists()
                    .col(string_len(Subject::Id, 36).primary_key())
                    .col(string_len(Subject::Name, 200))
                    .col(string_len(Subject::TeacherId, 36))
                    .col(timestamp(Subject::CreatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Assignment::Table)
                    .if_not_exists()
                    .col(string_len(Assignment::Id, 36).primary_key())
                    .col(string_len(Assignment::SubjectId, 36))
                    .col(string_len(Assignment::Title, 200))
                    .col(text(Assignment::InputPath))
                    .col(text(Assignment::OutputPath))
                    .col(text(Assignment::QuestionPath))
                    .col(timestamp(Assignment::CreatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-assignments-subject_id")
                            .from(Assignment::Table, Assignment::SubjectId)
                            .to(Subject::Table, Subject::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Submission::Table)
                    .if_not_exists()
                    .col(string_len(Submission::Id, 36).primary_key())
                    .col(string_len(Submission::AssignmentId, 36))
                    .col(string_len(Submission::StudentId, 36))
                    .col(text(Submission::UploadPath))
                    .col(
                        big_integer(Submission::Score)
                            .default(0)
                            .check(Expr::col(Submission::Score).gte(0)),
                    )
                    // SubmissionStatus enum is represented in app code.
                    // 0=pending, 1=graded, 2=failed
                    .col(
                        small_integer(Submission::Status)
                            .default(0)
                            .check(Expr::col(Submission::Status).between(0, 2)),
                    )
                    .col(timestamp(Submission::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp(Submission::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-submissions-assignment_id")
                            .from(Submission::Table, Submission::AssignmentId)
                            .to(Assignment::Table, Assignment::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_assignments_subject_id")
                    .table(Assignment::Table)
                    .col(Assignment::SubjectId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_submissions_assignment_id")
                    .table(Submission::Table)
                    .col(Submission::AssignmentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Submission::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Assignment::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Subject::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Subject {
    Table,
    Id,
    Name,
    TeacherId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Assignment {
    Table,
    Id,
    SubjectId,
    Title,
    InputPath,
    OutputPath,
    QuestionPath,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Submission {
    Table,
    Id,
    AssignmentId,
    StudentId,
    UploadPath,
    Score,
    Status,
    CreatedAt,
    UpdatedAt,
}
