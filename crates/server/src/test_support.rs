//! SQLite-backed fixtures shared by the repository and route tests.

use crate::entity::{assignment, subject, submission};
use apgw_core::domain::{AssignmentId, StudentId, SubjectId, SubmissionId, TeacherId};
use apgw_migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, Database, DatabaseConnection};

pub async fn memory_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("connect sqlite");
    Migrator::up(&db, None).await.expect("run migrations");
    db
}

pub async fn insert_subject(db: &DatabaseConnection, teacher: TeacherId) -> SubjectId {
    let id = SubjectId::new();
    subject::ActiveModel {
        id: Set(id.to_string()),
        name: Set("Programming I".to_string()),
        teacher_id: Set(teacher.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert subject");
    id
}

pub async fn insert_assignment(db: &DatabaseConnection, subject_id: SubjectId) -> AssignmentId {
    let id = AssignmentId::new();
    assignment::ActiveModel {
        id: Set(id.to_string()),
        subject_id: Set(subject_id.to_string()),
        title: Set("Sum of two numbers".to_string()),
        input_path: Set("/srv/assi/input".to_string()),
        output_path: Set("/srv/assi/output".to_string()),
        question_path: Set("/srv/assi/question".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert assignment");
    id
}

pub async fn insert_submission(
    db: &DatabaseConnection,
    assignment_id: AssignmentId,
    upload_path: &str,
) -> SubmissionId {
    let id = SubmissionId::new();
    submission::ActiveModel {
        id: Set(id.to_string()),
        assignment_id: Set(assignment_id.to_string()),
        student_id: Set(StudentId::new().to_string()),
        upload_path: Set(upload_path.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert submission");
    id
}
