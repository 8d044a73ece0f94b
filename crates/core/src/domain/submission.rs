use std::path::PathBuf;

use super::{
    AssignmentId, GradeResult, Score, SourceLanguage, StudentId, SubmissionId, SubmissionStatus,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub id: SubmissionId,
    pub assignment_id: AssignmentId,
    pub student_id: StudentId,
    pub upload_path: PathBuf,
    pub score: Score,
    pub status: SubmissionStatus,
}

impl Submission {
    pub fn new(
        assignment_id: AssignmentId,
        student_id: StudentId,
        upload_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: SubmissionId::new(),
            assignment_id,
            student_id,
            upload_path: upload_path.into(),
            score: Score::ZERO,
            status: SubmissionStatus::Pending,
        }
    }

    /// Extension of the uploaded file as given by the student, if any.
    pub fn source_extension(&self) -> Option<&str> {
        self.upload_path.extension().and_then(|ext| ext.to_str())
    }

    pub fn language(&self) -> Option<SourceLanguage> {
        SourceLanguage::from_path(&self.upload_path)
    }

    pub fn apply_grade(&mut self, result: &GradeResult) {
        self.score = result.score();
        self.status = SubmissionStatus::Graded;
    }

    /// Marks the attempt as failed. The previous score is kept.
    pub fn mark_failed(&mut self) {
        self.status = SubmissionStatus::Failed;
    }
}
