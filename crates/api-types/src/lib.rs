//! Shared request/response types used by API-facing crates.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
}

impl HealthCheckResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionGradeStatus {
    Graded,
    Failed,
}

/// One submission's line in a grading report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResultResponse {
    pub submission_id: String,
    pub student_id: String,
    pub status: SubmissionGradeStatus,
    /// Present only when the submission was graded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    /// The toolchain output could not be read as a score; `score` is 0.
    #[serde(default)]
    pub parse_failure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingReportResponse {
    pub assignment_id: String,
    /// RFC 3339 timestamps.
    pub started_at: String,
    pub finished_at: String,
    pub graded: usize,
    pub failed: usize,
    pub parse_failures: usize,
    pub submissions: Vec<SubmissionResultResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_check_ok_payload() {
        let response = HealthCheckResponse::ok();
        assert_eq!(response.status, "ok");
    }

    #[test]
    fn failed_submission_omits_score() {
        let response = SubmissionResultResponse {
            submission_id: "s-1".to_string(),
            student_id: "st-1".to_string(),
            status: SubmissionGradeStatus::Failed,
            score: None,
            parse_failure: false,
            error: Some(ErrorResponse {
                code: "UNSUPPORTED_LANGUAGE".to_string(),
                message: "unsupported source file".to_string(),
            }),
        };

        let json = serde_json::to_value(&response).expect("serialize submission result");

        assert_eq!(json["status"], "failed");
        assert!(json.get("score").is_none());
        assert_eq!(json["error"]["code"], "UNSUPPORTED_LANGUAGE");
    }

    #[test]
    fn graded_submission_payload_is_readable_by_clients() {
        let json = r#"{
            "submission_id": "s-2",
            "student_id": "st-2",
            "status": "graded",
            "score": 0,
            "parse_failure": true
        }"#;

        let decoded: SubmissionResultResponse =
            serde_json::from_str(json).expect("deserialize submission result");

        assert_eq!(decoded.status, SubmissionGradeStatus::Graded);
        assert_eq!(decoded.score, Some(0));
        assert!(decoded.parse_failure);
        assert!(decoded.error.is_none());
    }
}
