use crate::entity::{assignment, subject};
use apgw_core::domain::{AssignmentId, OwnershipCheck, StoreError, TeacherId};
use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait};

/// Resolves ownership through assignment → subject → teacher.
#[derive(Clone)]
pub struct SeaOrmOwnershipCheck {
    db: DatabaseConnection,
}

impl SeaOrmOwnershipCheck {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OwnershipCheck for SeaOrmOwnershipCheck {
    async fn is_owner(
        &self,
        teacher: TeacherId,
        assignment_id: AssignmentId,
    ) -> Result<bool, StoreError> {
        let row = assignment::Entity::find_by_id(assignment_id.to_string())
            .find_also_related(subject::Entity)
            .one(&self.db)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        match row {
            None => Err(StoreError::NotFound(format!("assignment {assignment_id}"))),
            Some((_, Some(subject))) => Ok(subject.teacher_id == teacher.to_string()),
            Some((_, None)) => Ok(false),
        }
    }
}
