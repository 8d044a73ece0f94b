use crate::entity::{assignment, submission};
use anyhow::{Result, anyhow};
use apgw_core::domain::{
    Assignment, AssignmentId, FixturePaths, GradingStore, Score, StoreError, StudentId, SubjectId,
    Submission, SubmissionId, SubmissionStatus,
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder,
};
use std::path::PathBuf;
use std::str::FromStr;

/// `GradingStore` backed by the `assignment` and `submission` tables.
#[derive(Clone)]
pub struct SeaOrmGradingStore {
    db: DatabaseConnection,
}

impl SeaOrmGradingStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn map_status(code: i16) -> Result<SubmissionStatus> {
        match code {
            0 => Ok(SubmissionStatus::Pending),
            1 => Ok(SubmissionStatus::Graded),
            2 => Ok(SubmissionStatus::Failed),
            _ => Err(anyhow!("invalid submission.status code from database: {code}")),
        }
    }

    fn map_status_code(status: SubmissionStatus) -> i16 {
        match status {
            SubmissionStatus::Pending => 0,
            SubmissionStatus::Graded => 1,
            SubmissionStatus::Failed => 2,
        }
    }

    fn map_assignment(model: assignment::Model) -> Result<Assignment> {
        let id = AssignmentId::from_str(&model.id)
            .map_err(|e| anyhow!("invalid assignment.id '{}' from database: {e}", model.id))?;
        let subject_id = SubjectId::from_str(&model.subject_id).map_err(|e| {
            anyhow!(
                "invalid assignment.subject_id '{}' from database: {e}",
                model.subject_id
            )
        })?;

        Ok(Assignment {
            id,
            subject_id,
            title: model.title,
            fixtures: FixturePaths {
                input: PathBuf::from(model.input_path),
                output: PathBuf::from(model.output_path),
                question: PathBuf::from(model.question_path),
            },
        })
    }

    fn map_submission(model: submission::Model) -> Result<Submission> {
        let id = SubmissionId::from_str(&model.id)
            .map_err(|e| anyhow!("invalid submission.id '{}' from database: {e}", model.id))?;
        let assignment_id = AssignmentId::from_str(&model.assignment_id).map_err(|e| {
            anyhow!(
                "invalid submission.assignment_id '{}' from database: {e}",
                model.assignment_id
            )
        })?;
        let student_id = StudentId::from_str(&model.student_id).map_err(|e| {
            anyhow!(
                "invalid submission.student_id '{}' from database: {e}",
                model.student_id
            )
        })?;
        let score = Score::try_from(model.score)
            .map_err(|e| anyhow!("invalid submission.score from database: {e}"))?;

        Ok(Submission {
            id,
            assignment_id,
            student_id,
            upload_path: PathBuf::from(model.upload_path),
            score,
            status: Self::map_status(model.status)?,
        })
    }
}

fn backend(err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl GradingStore for SeaOrmGradingStore {
    async fn find_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>, StoreError> {
        let model = assignment::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await
            .map_err(backend)?;

        model
            .map(Self::map_assignment)
            .transpose()
            .map_err(backend)
    }

    async fn find_submissions_for_assignment(
        &self,
        id: AssignmentId,
    ) -> Result<Vec<Submission>, StoreError> {
        let models = submission::Entity::find()
            .filter(submission::Column::AssignmentId.eq(id.to_string()))
            .order_by_asc(submission::Column::CreatedAt)
            .order_by_asc(submission::Column::Id)
            .all(&self.db)
            .await
            .map_err(backend)?;

        models
            .into_iter()
            .map(Self::map_submission)
            .collect::<Result<Vec<_>>>()
            .map_err(backend)
    }

    async fn save_submission(&self, submission: &Submission) -> Result<(), StoreError> {
        let active_model = submission::ActiveModel {
            id: Set(submission.id.to_string()),
            score: Set(i64::from(submission.score.value())),
            status: Set(Self::map_status_code(submission.status)),
            updated_at: Set(Utc::now().naive_utc()),
            ..Default::default()
        };

        match active_model.update(&self.db).await {
            Ok(_) => Ok(()),
            Err(DbErr::RecordNotUpdated) => {
                Err(StoreError::NotFound(format!("submission {}", submission.id)))
            }
            Err(err) => Err(backend(err)),
        }
    }
}
