use std::path::PathBuf;

use super::{AssignmentId, SubjectId};

/// Hidden fixtures a teacher uploaded with the assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixturePaths {
    pub input: PathBuf,
    pub output: PathBuf,
    pub question: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub id: AssignmentId,
    pub subject_id: SubjectId,
    pub title: String,
    pub fixtures: FixturePaths,
}
