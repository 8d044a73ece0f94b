use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
type Result<T> = anyhow::Result<T>;

#[derive(Debug, Deserialize, Clone)]
pub struct GraderConfig {
    /// 每个提交的临时工作区都创建在该目录下。
    pub workspace_root: PathBuf,
    /// 存放工具链入口脚本（如 `c-script.sh`）的目录。
    pub scripts_dir: PathBuf,
    #[serde(default = "default_container_runtime")]
    pub container_runtime: String,
    #[serde(default = "default_container_mount_path")]
    pub container_mount_path: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
    #[serde(default = "default_toolchains")]
    pub toolchains: Vec<ToolchainConfig>,
}

impl GraderConfig {
    pub fn new(workspace_root: impl Into<PathBuf>, scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            scripts_dir: scripts_dir.into(),
            container_runtime: default_container_runtime(),
            container_mount_path: default_container_mount_path(),
            timeout_secs: default_timeout_secs(),
            max_concurrency: default_max_concurrency(),
            event_buffer_size: default_event_buffer_size(),
            toolchains: default_toolchains(),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("failed to deserialize grader config")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ToolchainConfig {
    /// 语言标识，使用源文件扩展名（`c`、`cpp`）。
    pub language: String,
    pub image: String,
    pub entrypoint: String,
    /// 是否通过 `CodeFileExt` 环境变量告知脚本源文件扩展名。
    #[serde(default)]
    pub pass_extension: bool,
}

fn default_container_runtime() -> String {
    "docker".to_string()
}

fn default_container_mount_path() -> String {
    "/home/files".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_max_concurrency() -> usize {
    2
}

fn default_event_buffer_size() -> usize {
    1_000
}

fn default_toolchains() -> Vec<ToolchainConfig> {
    vec![
        ToolchainConfig {
            language: "c".to_string(),
            image: "gcc:7.3".to_string(),
            entrypoint: "c-script.sh".to_string(),
            pass_extension: false,
        },
        ToolchainConfig {
            language: "cpp".to_string(),
            image: "gcc:7.3".to_string(),
            entrypoint: "cpp-script.sh".to_string(),
            pass_extension: true,
        },
    ]
}
