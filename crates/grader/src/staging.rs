//! 将作业的隐藏测试文件与学生源码暂存到工作区。
//!
//! 工作区布局（版本 1），与工具链入口脚本约定一致：
//!
//! | 路径 | 内容 |
//! |---|---|
//! | `input` | 作业输入用例 |
//! | `output` | 作业期望输出 |
//! | `question` | 作业题目文件 |
//! | `submission.<ext>` | 学生提交的源文件，保留原扩展名 |
//! | `<entrypoint>` | 工具链入口脚本，可执行 |
//!
//! 修改布局时必须同步更新入口脚本并递增 [`LAYOUT_VERSION`]。

use std::io;
use std::path::{Path, PathBuf};

use apgw_core::domain::{Assignment, Submission};
use thiserror::Error;
use tracing::debug;

use crate::toolchain::Toolchain;
use crate::workspace::WorkspaceHandle;

pub const LAYOUT_VERSION: u32 = 1;
pub const INPUT_FILE: &str = "input";
pub const OUTPUT_FILE: &str = "output";
pub const QUESTION_FILE: &str = "question";
pub const SOURCE_STEM: &str = "submission";

#[derive(Debug, Error)]
#[error("暂存 {file} ({}) 失败: {source}", .path.display())]
pub struct StagingError {
    pub file: &'static str,
    pub path: PathBuf,
    pub source: io::Error,
}

/// 暂存完成后工作区中各文件的位置。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedLayout {
    pub input: PathBuf,
    pub output: PathBuf,
    pub question: PathBuf,
    pub source: PathBuf,
    pub entrypoint: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FixtureStager {
    scripts_dir: PathBuf,
}

impl FixtureStager {
    pub fn new(scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
        }
    }

    /// 按固定布局暂存全部文件。
    ///
    /// 失败时工作区可能只暂存了一部分，调用方必须释放它，不得复用。
    pub async fn stage(
        &self,
        workspace: &WorkspaceHandle,
        assignment: &Assignment,
        submission: &Submission,
        toolchain: &Toolchain,
    ) -> Result<StagedLayout, StagingError> {
        let layout = StagedLayout {
            input: workspace.join(INPUT_FILE),
            output: workspace.join(OUTPUT_FILE),
            question: workspace.join(QUESTION_FILE),
            source: workspace.join(source_file_name(submission)),
            entrypoint: workspace.join(&toolchain.entrypoint),
        };

        copy_file("input", &assignment.fixtures.input, &layout.input).await?;
        copy_file("output", &assignment.fixtures.output, &layout.output).await?;
        copy_file("question", &assignment.fixtures.question, &layout.question).await?;
        copy_file("source", &submission.upload_path, &layout.source).await?;

        let script = self.scripts_dir.join(&toolchain.entrypoint);
        copy_file("entrypoint", &script, &layout.entrypoint).await?;
        make_executable(&layout.entrypoint).await?;

        debug!(
            submission_id = %submission.id,
            workspace = %workspace.path().display(),
            layout_version = LAYOUT_VERSION,
            "fixtures staged"
        );
        Ok(layout)
    }
}

fn source_file_name(submission: &Submission) -> String {
    match submission.source_extension() {
        Some(ext) => format!("{SOURCE_STEM}.{ext}"),
        None => SOURCE_STEM.to_string(),
    }
}

async fn copy_file(file: &'static str, from: &Path, to: &Path) -> Result<(), StagingError> {
    let metadata = tokio::fs::metadata(from)
        .await
        .map_err(|source| StagingError {
            file,
            path: from.to_path_buf(),
            source,
        })?;
    if !metadata.is_file() {
        return Err(StagingError {
            file,
            path: from.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }

    tokio::fs::copy(from, to)
        .await
        .map_err(|source| StagingError {
            file,
            path: from.to_path_buf(),
            source,
        })?;
    Ok(())
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<(), StagingError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(|source| StagingError {
            file: "entrypoint",
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> Result<(), StagingError> {
    Ok(())
}
