use apgw_core::domain::{AssignmentId, GradeResult, StudentId, SubmissionId};
use chrono::{DateTime, Utc};

use crate::error::GradingFailure;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Graded(GradeResult),
    Failed(GradingFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReport {
    pub submission_id: SubmissionId,
    pub student_id: StudentId,
    pub outcome: SubmissionOutcome,
}

/// 一次 `grade_assignment` 调用的评分报告。
///
/// 评分开始时存在的每个提交恰好对应一条记录，顺序与存储返回的顺序一致。
#[derive(Debug, Clone)]
pub struct GradingReport {
    pub assignment_id: AssignmentId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub entries: Vec<SubmissionReport>,
}

impl GradingReport {
    pub fn entry(&self, submission_id: SubmissionId) -> Option<&SubmissionReport> {
        self.entries
            .iter()
            .find(|entry| entry.submission_id == submission_id)
    }

    pub fn graded_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.outcome, SubmissionOutcome::Graded(_)))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.len() - self.graded_count()
    }

    pub fn parse_failure_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| {
                matches!(&entry.outcome, SubmissionOutcome::Graded(result) if result.is_parse_failure())
            })
            .count()
    }
}
