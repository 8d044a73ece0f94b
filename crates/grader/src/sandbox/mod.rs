//! 容器化评测执行层。
//!
//! 该模块把“为某种语言运行评测容器”抽象为结构化的调用描述
//! [`ContainerInvocation`]，再交给可替换的 [`ProcessRunner`] 执行：
//! 1. 根据语言解析工具链（镜像与入口脚本）；
//! 2. 以参数列表（而非 shell 字符串）构造容器命令；
//! 3. 在有限时间内等待容器退出并收集标准输出。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use apgw_core::domain::{SourceLanguage, SubmissionId};
use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::GraderConfig;
use crate::toolchain::{Toolchain, ToolchainRegistry};
use crate::workspace::WorkspaceHandle;

pub mod process;

pub use process::TokioProcessRunner;

/// 传给 C++ 入口脚本的源文件扩展名环境变量。
pub const EXTENSION_ENV_VAR: &str = "CodeFileExt";
/// 评测容器名前缀，后接提交 ID。
pub const CONTAINER_NAME_PREFIX: &str = "apgw-grade-";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("no toolchain configured for {0}")]
    UnsupportedLanguage(SourceLanguage),

    #[error("failed to launch container: {0}")]
    Launch(String),

    #[error("failed to collect container output: {0}")]
    Io(String),

    #[error("container did not finish within {0:?}")]
    Timeout(Duration),

    #[error("container run cancelled")]
    Cancelled,
}

/// 一次容器运行的完整命令描述。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInvocation {
    pub program: String,
    pub args: Vec<String>,
    /// 容器名，超时或取消时用于强制删除容器。
    pub container_name: String,
}

/// 容器的原始输出。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl RawOutput {
    /// 标准输出的最后一行，即工具链约定的分数信号。
    pub fn last_line(&self) -> &str {
        self.stdout.lines().last().unwrap_or_default()
    }
}

/// 进程执行抽象，测试中可替换为假实现。
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// 运行容器并阻塞至其退出、超时或被取消。
    ///
    /// 超时或取消时，实现必须终止容器进程。
    async fn run(
        &self,
        invocation: &ContainerInvocation,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RawOutput, ExecutionError>;
}

pub struct SandboxExecutor {
    runner: Arc<dyn ProcessRunner>,
    toolchains: Arc<ToolchainRegistry>,
    runtime: String,
    mount_path: String,
    timeout: Duration,
}

impl SandboxExecutor {
    pub fn new(
        config: &GraderConfig,
        toolchains: Arc<ToolchainRegistry>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            runner,
            toolchains,
            runtime: config.container_runtime.clone(),
            mount_path: config.container_mount_path.clone(),
            timeout: config.timeout(),
        }
    }

    pub fn toolchains(&self) -> &ToolchainRegistry {
        &self.toolchains
    }

    /// 构造容器命令：
    /// `run --rm --name <name> [-e CodeFileExt=<ext>] -v <workspace>:<mount> -w <mount> <image> ./<entrypoint>`
    pub fn invocation(
        &self,
        workspace_path: &Path,
        toolchain: &Toolchain,
        extension: &str,
        submission_id: SubmissionId,
    ) -> ContainerInvocation {
        let container_name = format!("{CONTAINER_NAME_PREFIX}{submission_id}");
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            container_name.clone(),
        ];

        if toolchain.pass_extension {
            args.extend(["-e".to_string(), format!("{EXTENSION_ENV_VAR}={extension}")]);
        }

        args.extend([
            "-v".to_string(),
            format!("{}:{}", workspace_path.display(), self.mount_path),
            "-w".to_string(),
            self.mount_path.clone(),
            toolchain.image.clone(),
            format!("./{}", toolchain.entrypoint),
        ]);

        ContainerInvocation {
            program: self.runtime.clone(),
            args,
            container_name,
        }
    }

    /// 在工作区上运行指定语言的评测容器。
    pub async fn execute(
        &self,
        workspace: &WorkspaceHandle,
        language: SourceLanguage,
        extension: &str,
        cancel: &CancellationToken,
    ) -> Result<RawOutput, ExecutionError> {
        let toolchain = self
            .toolchains
            .resolve(language)
            .ok_or(ExecutionError::UnsupportedLanguage(language))?;

        // 挂载源路径必须是绝对路径。
        let workspace_path = std::path::absolute(workspace.path())
            .map_err(|err| ExecutionError::Launch(err.to_string()))?;
        let invocation = self.invocation(
            &workspace_path,
            toolchain,
            extension,
            workspace.submission_id(),
        );

        info!(
            submission_id = %workspace.submission_id(),
            language = %language,
            image = %toolchain.image,
            container = %invocation.container_name,
            "running grading container"
        );

        let output = self.runner.run(&invocation, self.timeout, cancel).await?;
        if output.exit_code != Some(0) {
            warn!(
                submission_id = %workspace.submission_id(),
                exit_code = ?output.exit_code,
                stderr = %output.stderr.trim_end(),
                "grading container exited unsuccessfully"
            );
        }
        Ok(output)
    }
}
