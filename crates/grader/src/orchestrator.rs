use std::sync::Arc;

use apgw_core::domain::{
    Assignment, AssignmentId, GradeResult, GradingStore, OwnershipCheck, Submission, TeacherId,
};
use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::events::{EventBroadcaster, EventStream, GradingEvent};
use crate::interpreter::interpret;
use crate::report::{GradingReport, SubmissionOutcome, SubmissionReport};
use crate::sandbox::{ProcessRunner, SandboxExecutor, TokioProcessRunner};
use crate::staging::FixtureStager;
use crate::toolchain::ToolchainRegistry;
use crate::workspace::WorkspaceManager;
use crate::{GraderConfig, GraderError, GradingFailure, Result};

/// 作业评分编排器。
///
/// 对作业下的每个提交依次执行“创建工作区 → 暂存 → 运行容器 → 解析分数 → 删除工作区”，
/// 不同提交之间最多并发 `max_concurrency` 个。
pub struct GradingOrchestrator {
    store: Arc<dyn GradingStore>,
    ownership: Arc<dyn OwnershipCheck>,
    workspaces: WorkspaceManager,
    stager: FixtureStager,
    executor: SandboxExecutor,
    max_concurrency: usize,
    event_broadcaster: Arc<EventBroadcaster>,
}

impl GradingOrchestrator {
    pub fn new(
        config: GraderConfig,
        store: Arc<dyn GradingStore>,
        ownership: Arc<dyn OwnershipCheck>,
    ) -> Result<Self> {
        Self::with_runner(config, store, ownership, Arc::new(TokioProcessRunner::new()))
    }

    /// 使用自定义进程运行器创建编排器。
    pub fn with_runner(
        config: GraderConfig,
        store: Arc<dyn GradingStore>,
        ownership: Arc<dyn OwnershipCheck>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Result<Self> {
        if config.max_concurrency == 0 {
            return Err(GraderError::Config("max_concurrency 必须大于 0".to_string()));
        }
        if config.timeout_secs == 0 {
            return Err(GraderError::Config("timeout_secs 必须大于 0".to_string()));
        }
        if config.event_buffer_size == 0 {
            return Err(GraderError::Config("event_buffer_size 必须大于 0".to_string()));
        }
        let toolchains = Arc::new(ToolchainRegistry::from_config(&config.toolchains)?);

        info!(
            workspace_root = %config.workspace_root.display(),
            runtime = %config.container_runtime,
            timeout_secs = config.timeout_secs,
            max_concurrency = config.max_concurrency,
            "initializing grading orchestrator"
        );

        Ok(Self {
            store,
            ownership,
            workspaces: WorkspaceManager::new(&config.workspace_root),
            stager: FixtureStager::new(&config.scripts_dir),
            executor: SandboxExecutor::new(&config, toolchains, runner),
            max_concurrency: config.max_concurrency,
            event_broadcaster: Arc::new(EventBroadcaster::new(config.event_buffer_size)),
        })
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    pub fn subscribe_events(&self) -> EventStream {
        self.event_broadcaster.subscribe()
    }

    /// 为作业的全部提交评分。
    ///
    /// 权限检查在任何工作区操作之前完成。单个提交的失败记录在报告里，
    /// 只有权限、作业不存在和存储读取错误会让整个调用失败。
    #[tracing::instrument(skip(self, cancel))]
    pub async fn grade_assignment(
        &self,
        teacher: TeacherId,
        assignment_id: AssignmentId,
        cancel: &CancellationToken,
    ) -> Result<GradingReport> {
        if !self.ownership.is_owner(teacher, assignment_id).await? {
            warn!("grading rejected, caller does not own the assignment");
            return Err(GraderError::NotOwner(assignment_id));
        }

        let assignment = self
            .store
            .find_assignment(assignment_id)
            .await?
            .ok_or(GraderError::AssignmentNotFound(assignment_id))?;
        let submissions = self
            .store
            .find_submissions_for_assignment(assignment_id)
            .await?;

        let started_at = Utc::now();
        info!(
            title = %assignment.title,
            submission_count = submissions.len(),
            "grading assignment"
        );
        self.event_broadcaster.emit(GradingEvent::GradingStarted {
            assignment_id: assignment_id.into_inner(),
            submission_count: submissions.len(),
        });

        let assignment = &assignment;
        let mut entries: Vec<(usize, SubmissionReport)> =
            stream::iter(submissions.into_iter().enumerate())
                .map(|(index, submission)| async move {
                    let entry = self.grade_submission(assignment, submission, cancel).await;
                    (index, entry)
                })
                .buffer_unordered(self.max_concurrency)
                .collect()
                .await;
        entries.sort_by_key(|(index, _)| *index);

        let report = GradingReport {
            assignment_id,
            started_at,
            finished_at: Utc::now(),
            entries: entries.into_iter().map(|(_, entry)| entry).collect(),
        };

        info!(
            graded = report.graded_count(),
            failed = report.failed_count(),
            parse_failures = report.parse_failure_count(),
            "assignment grading finished"
        );
        self.event_broadcaster.emit(GradingEvent::GradingFinished {
            assignment_id: assignment_id.into_inner(),
            graded: report.graded_count(),
            failed: report.failed_count(),
        });

        Ok(report)
    }

    async fn grade_submission(
        &self,
        assignment: &Assignment,
        mut submission: Submission,
        cancel: &CancellationToken,
    ) -> SubmissionReport {
        let result = if cancel.is_cancelled() {
            Err(GradingFailure::Cancelled)
        } else {
            self.run_pipeline(assignment, &submission, cancel).await
        };

        let outcome = match result {
            // 取消的提交保持原状态，留待下次评分。
            Err(GradingFailure::Cancelled) => SubmissionOutcome::Failed(GradingFailure::Cancelled),
            result => {
                match &result {
                    Ok(grade) => submission.apply_grade(grade),
                    Err(_) => submission.mark_failed(),
                }
                match (result, self.store.save_submission(&submission).await) {
                    (_, Err(err)) => {
                        SubmissionOutcome::Failed(GradingFailure::Persistence(err.to_string()))
                    }
                    (Ok(grade), Ok(())) => SubmissionOutcome::Graded(grade),
                    (Err(failure), Ok(())) => SubmissionOutcome::Failed(failure),
                }
            }
        };

        self.record(assignment.id, &submission, &outcome);
        SubmissionReport {
            submission_id: submission.id,
            student_id: submission.student_id,
            outcome,
        }
    }

    /// 单个提交的流水线。工作区在每条退出路径上都会被释放。
    async fn run_pipeline(
        &self,
        assignment: &Assignment,
        submission: &Submission,
        cancel: &CancellationToken,
    ) -> std::result::Result<GradeResult, GradingFailure> {
        let extension = submission.source_extension().unwrap_or_default();
        let unsupported = || GradingFailure::UnsupportedLanguage {
            extension: extension.to_string(),
        };
        let language = submission.language().ok_or_else(unsupported)?;
        let toolchain = self
            .executor
            .toolchains()
            .resolve(language)
            .ok_or_else(unsupported)?;

        let mut workspace = self.workspaces.acquire(submission.id).await?;

        let result = async {
            self.stager
                .stage(&workspace, assignment, submission, toolchain)
                .await?;
            let output = self
                .executor
                .execute(&workspace, language, extension, cancel)
                .await?;
            Ok::<_, GradingFailure>(interpret(&output))
        }
        .await;

        if let Err(err) = self.workspaces.release(&mut workspace).await {
            warn!(submission_id = %submission.id, error = %err, "failed to release workspace");
        }
        result
    }

    fn record(
        &self,
        assignment_id: AssignmentId,
        submission: &Submission,
        outcome: &SubmissionOutcome,
    ) {
        match outcome {
            SubmissionOutcome::Graded(grade) => {
                if let GradeResult::ParseFailure { raw_line } = grade {
                    warn!(
                        submission_id = %submission.id,
                        raw_line = %raw_line,
                        "grading output could not be parsed, scored 0"
                    );
                } else {
                    info!(
                        submission_id = %submission.id,
                        score = grade.score().value(),
                        "submission graded"
                    );
                }
                self.event_broadcaster.emit(GradingEvent::SubmissionGraded {
                    assignment_id: assignment_id.into_inner(),
                    submission_id: submission.id.into_inner(),
                    score: grade.score().value(),
                    parse_failure: grade.is_parse_failure(),
                });
            }
            SubmissionOutcome::Failed(failure) => {
                warn!(
                    submission_id = %submission.id,
                    code = failure.code(),
                    error = %failure,
                    "submission grading failed"
                );
                self.event_broadcaster.emit(GradingEvent::SubmissionFailed {
                    assignment_id: assignment_id.into_inner(),
                    submission_id: submission.id.into_inner(),
                    code: failure.code().to_string(),
                    reason: failure.to_string(),
                });
            }
        }
    }
}
