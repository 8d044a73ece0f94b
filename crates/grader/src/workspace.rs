//! 提交评分工作区管理。
//!
//! 每个提交在 `<workspace_root>/submission-<id>` 下拥有独立的临时目录，
//! 目录路径只由提交 ID 决定，因此并发评分不同提交时不会冲突。

use std::io;
use std::path::{Path, PathBuf};

use apgw_core::domain::SubmissionId;
use thiserror::Error;
use tracing::{debug, info, warn};

/// 工作区目录名前缀。
pub const WORKSPACE_PREFIX: &str = "submission-";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("工作区已存在: {0}")]
    AlreadyExists(PathBuf),

    #[error("创建工作区 {path} 失败: {source}")]
    Create { path: PathBuf, source: io::Error },

    #[error("删除工作区 {path} 失败: {source}")]
    Remove { path: PathBuf, source: io::Error },
}

/// 工作区目录的创建与删除。
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 提交对应的工作区路径。
    pub fn workspace_path(&self, submission_id: SubmissionId) -> PathBuf {
        self.root.join(format!("{WORKSPACE_PREFIX}{submission_id}"))
    }

    /// 创建提交的工作区。
    ///
    /// 目录已存在时返回 [`WorkspaceError::AlreadyExists`]：
    /// 它要么正被另一次评分使用，要么是崩溃遗留，两种情况都不能复用。
    pub async fn acquire(
        &self,
        submission_id: SubmissionId,
    ) -> Result<WorkspaceHandle, WorkspaceError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| WorkspaceError::Create {
                path: self.root.clone(),
                source,
            })?;

        let path = self.workspace_path(submission_id);
        match tokio::fs::create_dir(&path).await {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(WorkspaceError::AlreadyExists(path));
            }
            Err(source) => return Err(WorkspaceError::Create { path, source }),
        }

        debug!(submission_id = %submission_id, path = %path.display(), "workspace acquired");
        Ok(WorkspaceHandle {
            submission_id,
            path,
            released: false,
        })
    }

    /// 递归删除工作区，可重复调用。
    pub async fn release(&self, handle: &mut WorkspaceHandle) -> Result<(), WorkspaceError> {
        if handle.released {
            return Ok(());
        }

        match tokio::fs::remove_dir_all(&handle.path).await {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(WorkspaceError::Remove {
                    path: handle.path.clone(),
                    source,
                });
            }
        }

        handle.released = true;
        debug!(
            submission_id = %handle.submission_id,
            path = %handle.path.display(),
            "workspace released"
        );
        Ok(())
    }

    /// 删除根目录下所有遗留的工作区，返回删除数量。
    ///
    /// 只应在没有评分进行时调用（例如服务启动时）。
    pub async fn purge_stale(&self) -> Result<usize, WorkspaceError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(WorkspaceError::Remove {
                    path: self.root.clone(),
                    source,
                });
            }
        };

        let mut purged = 0;
        loop {
            let entry = entries
                .next_entry()
                .await
                .map_err(|source| WorkspaceError::Remove {
                    path: self.root.clone(),
                    source,
                })?;
            let Some(entry) = entry else {
                break;
            };

            let is_workspace = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(WORKSPACE_PREFIX));
            if !is_workspace {
                continue;
            }

            let path = entry.path();
            tokio::fs::remove_dir_all(&path)
                .await
                .map_err(|source| WorkspaceError::Remove {
                    path: path.clone(),
                    source,
                })?;
            purged += 1;
        }

        if purged > 0 {
            info!(root = %self.root.display(), purged, "purged stale workspaces");
        }
        Ok(purged)
    }
}

/// 已创建的工作区。
///
/// 未经 [`WorkspaceManager::release`] 释放就被丢弃时（例如评分 future 被取消），
/// 会在 `Drop` 中同步删除目录。
#[derive(Debug)]
pub struct WorkspaceHandle {
    submission_id: SubmissionId,
    path: PathBuf,
    released: bool,
}

impl WorkspaceHandle {
    pub fn submission_id(&self) -> SubmissionId {
        self.submission_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: impl AsRef<Path>) -> PathBuf {
        self.path.join(name)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for WorkspaceHandle {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {
                warn!(
                    submission_id = %self.submission_id,
                    path = %self.path.display(),
                    "workspace dropped without release, removed"
                );
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(
                    submission_id = %self.submission_id,
                    path = %self.path.display(),
                    error = %err,
                    "failed to remove dropped workspace"
                );
            }
        }
    }
}
