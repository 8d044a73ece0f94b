use async_trait::async_trait;
use thiserror::Error;

use super::{Assignment, AssignmentId, Submission, TeacherId};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("storage backend failed: {0}")]
    Backend(String),
}

/// Persistence boundary the grader reads assignments from and writes scores to.
#[async_trait]
pub trait GradingStore: Send + Sync {
    async fn find_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>, StoreError>;

    async fn find_submissions_for_assignment(
        &self,
        id: AssignmentId,
    ) -> Result<Vec<Submission>, StoreError>;

    async fn save_submission(&self, submission: &Submission) -> Result<(), StoreError>;
}

#[async_trait]
pub trait OwnershipCheck: Send + Sync {
    async fn is_owner(
        &self,
        teacher: TeacherId,
        assignment: AssignmentId,
    ) -> Result<bool, StoreError>;
}
