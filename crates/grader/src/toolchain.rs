//! 源语言到评测工具链（镜像 + 入口脚本）的映射。

use std::collections::HashMap;

use apgw_core::domain::SourceLanguage;

use crate::config::ToolchainConfig;
use crate::error::{GraderError, Result};

/// 单个语言的容器化工具链。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub language: SourceLanguage,
    pub image: String,
    pub entrypoint: String,
    pub pass_extension: bool,
}

/// 语言与工具链的唯一注册表。
///
/// 构造时要求 [`SourceLanguage::ALL`] 中每种语言都恰好有一条映射，
/// 因此缺失映射属于配置错误，而不会在评分时悄悄生成空命令。
#[derive(Debug, Clone)]
pub struct ToolchainRegistry {
    toolchains: HashMap<SourceLanguage, Toolchain>,
}

impl ToolchainRegistry {
    pub fn from_config(entries: &[ToolchainConfig]) -> Result<Self> {
        let mut toolchains = HashMap::new();

        for entry in entries {
            let language = SourceLanguage::from_extension(&entry.language).ok_or_else(|| {
                GraderError::Config(format!("未知的工具链语言: {}", entry.language))
            })?;

            if entry.image.trim().is_empty() {
                return Err(GraderError::Config(format!(
                    "工具链 {language} 缺少镜像名称"
                )));
            }
            if !is_bare_file_name(&entry.entrypoint) {
                return Err(GraderError::Config(format!(
                    "工具链 {language} 的入口脚本必须是文件名: {}",
                    entry.entrypoint
                )));
            }

            let toolchain = Toolchain {
                language,
                image: entry.image.clone(),
                entrypoint: entry.entrypoint.clone(),
                pass_extension: entry.pass_extension,
            };
            if toolchains.insert(language, toolchain).is_some() {
                return Err(GraderError::Config(format!("工具链 {language} 重复配置")));
            }
        }

        if let Some(missing) = SourceLanguage::ALL
            .iter()
            .find(|language| !toolchains.contains_key(language))
        {
            return Err(GraderError::Config(format!("缺少语言 {missing} 的工具链")));
        }

        Ok(Self { toolchains })
    }

    pub fn resolve(&self, language: SourceLanguage) -> Option<&Toolchain> {
        self.toolchains.get(&language)
    }
}

// 入口脚本会被复制进工作区并以 `./<name>` 运行。
fn is_bare_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
}
