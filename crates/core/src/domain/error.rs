use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid score: {0}. score must be non-negative")]
    NegativeScore(i64),
    #[error("invalid score: {0}. score exceeds {max}", max = u32::MAX)]
    ScoreOverflow(i64),
}
