//! 作业评分 API 路由。

use std::str::FromStr;
use std::sync::Arc;

use apgw_api_types::{
    ErrorResponse, GradingReportResponse, SubmissionGradeStatus, SubmissionResultResponse,
};
use apgw_core::domain::{AssignmentId, StoreError, TeacherId};
use apgw_grader::{GraderError, GradingReport, SubmissionOutcome, SubmissionReport};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::error;

use super::state::AppState;

/// 调用方教师身份所在的请求头。
pub const TEACHER_ID_HEADER: &str = "x-teacher-id";

/// 创建作业评分路由。
pub fn create_grading_router() -> Router<Arc<AppState>> {
    Router::new().route("/api/assignments/{id}/grade", post(grade_assignment))
}

/// 为作业的全部提交评分，返回评分报告。
async fn grade_assignment(
    State(state): State<Arc<AppState>>,
    Path(assignment_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<GradingReportResponse>, ApiError> {
    let assignment_id = AssignmentId::from_str(&assignment_id)
        .map_err(|_| ApiError::invalid_request(format!("invalid assignment id: {assignment_id}")))?;
    let teacher = teacher_from_headers(&headers)?;

    // 客户端断开时 handler 被丢弃，drop guard 取消评分任务，容器由取消路径删除。
    let cancel = state.shutdown.child_token();
    let _disconnect_guard = cancel.clone().drop_guard();
    let orchestrator = state.orchestrator.clone();
    let grading = tokio::spawn(async move {
        orchestrator
            .grade_assignment(teacher, assignment_id, &cancel)
            .await
    });

    let report = grading.await.map_err(|err| {
        error!(error = %err, "grading task failed");
        ApiError::internal(format!("grading task failed: {err}"))
    })??;

    Ok(Json(report_response(&report)))
}

fn teacher_from_headers(headers: &HeaderMap) -> Result<TeacherId, ApiError> {
    let value = headers
        .get(TEACHER_ID_HEADER)
        .ok_or_else(|| ApiError::invalid_request(format!("missing {TEACHER_ID_HEADER} header")))?;
    let value = value
        .to_str()
        .map_err(|_| ApiError::invalid_request(format!("{TEACHER_ID_HEADER} is not ASCII")))?;

    TeacherId::from_str(value.trim())
        .map_err(|_| ApiError::invalid_request(format!("invalid {TEACHER_ID_HEADER}: {value}")))
}

fn report_response(report: &GradingReport) -> GradingReportResponse {
    GradingReportResponse {
        assignment_id: report.assignment_id.to_string(),
        started_at: report.started_at.to_rfc3339(),
        finished_at: report.finished_at.to_rfc3339(),
        graded: report.graded_count(),
        failed: report.failed_count(),
        parse_failures: report.parse_failure_count(),
        submissions: report.entries.iter().map(submission_response).collect(),
    }
}

fn submission_response(entry: &SubmissionReport) -> SubmissionResultResponse {
    let (status, score, parse_failure, error) = match &entry.outcome {
        SubmissionOutcome::Graded(result) => (
            SubmissionGradeStatus::Graded,
            Some(result.score().value()),
            result.is_parse_failure(),
            None,
        ),
        SubmissionOutcome::Failed(failure) => (
            SubmissionGradeStatus::Failed,
            None,
            false,
            Some(ErrorResponse {
                code: failure.code().to_string(),
                message: failure.to_string(),
            }),
        ),
    };

    SubmissionResultResponse {
        submission_id: entry.submission_id.to_string(),
        student_id: entry.student_id.to_string(),
        status,
        score,
        parse_failure,
        error,
    }
}

/// API 错误类型。
#[derive(Debug)]
pub struct ApiError {
    message: String,
    code: &'static str,
    status: StatusCode,
}

impl ApiError {
    fn invalid_request(message: String) -> Self {
        Self {
            message,
            code: "INVALID_REQUEST",
            status: StatusCode::BAD_REQUEST,
        }
    }

    fn internal(message: String) -> Self {
        Self {
            message,
            code: "INTERNAL_ERROR",
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GraderError> for ApiError {
    fn from(err: GraderError) -> Self {
        match err {
            GraderError::NotOwner(_) => ApiError {
                message: err.to_string(),
                code: "NOT_OWNER",
                status: StatusCode::FORBIDDEN,
            },
            GraderError::AssignmentNotFound(_) | GraderError::Store(StoreError::NotFound(_)) => {
                ApiError {
                    message: err.to_string(),
                    code: "ASSIGNMENT_NOT_FOUND",
                    status: StatusCode::NOT_FOUND,
                }
            }
            other => {
                error!(error = %other, "grading request failed");
                ApiError::internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            code: self.code.to_string(),
            message: self.message,
        });
        (self.status, body).into_response()
    }
}
