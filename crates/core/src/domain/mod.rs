mod assignment;
mod error;
mod grade;
mod ids;
mod language;
mod score;
mod store;
mod submission;
mod submission_status;

pub use assignment::{Assignment, FixturePaths};
pub use error::DomainError;
pub use grade::GradeResult;
pub use ids::{AssignmentId, StudentId, SubjectId, SubmissionId, TeacherId};
pub use language::SourceLanguage;
pub use score::Score;
pub use store::{GradingStore, OwnershipCheck, StoreError};
pub use submission::Submission;
pub use submission_status::SubmissionStatus;
