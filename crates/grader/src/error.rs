use apgw_core::domain::{AssignmentId, StoreError};
use thiserror::Error;

use crate::sandbox::ExecutionError;
use crate::staging::StagingError;
use crate::workspace::WorkspaceError;

/// 整次评分调用的致命错误。
///
/// 这些错误会直接返回给 `grade_assignment` 的调用方；
/// 单个提交的失败见 [`GradingFailure`]。
#[derive(Debug, Error)]
pub enum GraderError {
    #[error("无权对该作业评分: {0}")]
    NotOwner(AssignmentId),

    #[error("作业未找到: {0}")]
    AssignmentNotFound(AssignmentId),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("存储错误: {0}")]
    Store(#[from] StoreError),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML 错误: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GraderError>;

/// 单个提交在评分流水线中的失败原因。
///
/// 这些失败只记录在评分报告中，不会中断同一作业下其他提交的评分。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GradingFailure {
    #[error("工作区错误: {0}")]
    Filesystem(String),

    #[error("暂存 {file} 失败: {reason}")]
    Staging { file: String, reason: String },

    #[error("不支持的源文件类型: {extension:?}")]
    UnsupportedLanguage { extension: String },

    #[error("容器执行失败: {0}")]
    Execution(String),

    #[error("容器执行超时 ({timeout_secs}s)")]
    ExecutionTimeout { timeout_secs: u64 },

    #[error("评分已取消")]
    Cancelled,

    #[error("保存评分结果失败: {0}")]
    Persistence(String),
}

impl GradingFailure {
    /// 稳定的机器可读错误码，供 API 层使用。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Filesystem(_) => "FILESYSTEM_ERROR",
            Self::Staging { .. } => "STAGING_ERROR",
            Self::UnsupportedLanguage { .. } => "UNSUPPORTED_LANGUAGE",
            Self::Execution(_) => "EXECUTION_ERROR",
            Self::ExecutionTimeout { .. } => "EXECUTION_TIMEOUT",
            Self::Cancelled => "CANCELLED",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }
}

impl From<WorkspaceError> for GradingFailure {
    fn from(err: WorkspaceError) -> Self {
        Self::Filesystem(err.to_string())
    }
}

impl From<StagingError> for GradingFailure {
    fn from(err: StagingError) -> Self {
        Self::Staging {
            file: err.file.to_string(),
            reason: err.source.to_string(),
        }
    }
}

impl From<ExecutionError> for GradingFailure {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::UnsupportedLanguage(language) => Self::UnsupportedLanguage {
                extension: language.to_string(),
            },
            ExecutionError::Timeout(timeout) => Self::ExecutionTimeout {
                timeout_secs: timeout.as_secs(),
            },
            ExecutionError::Cancelled => Self::Cancelled,
            other @ (ExecutionError::Launch(_) | ExecutionError::Io(_)) => {
                Self::Execution(other.to_string())
            }
        }
    }
}
