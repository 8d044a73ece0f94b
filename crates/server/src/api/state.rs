//! 统一的应用状态。

use std::sync::Arc;

use apgw_grader::{CancellationToken, GradingOrchestrator};

/// 统一的应用状态，包含所有服务共享的数据。
#[derive(Clone)]
pub struct AppState {
    /// 作业评分编排器。
    pub orchestrator: Arc<GradingOrchestrator>,
    /// 服务关闭时取消所有进行中的评分。
    pub shutdown: CancellationToken,
}

impl AppState {
    /// 创建新的应用状态。
    pub fn new(orchestrator: Arc<GradingOrchestrator>, shutdown: CancellationToken) -> Self {
        Self {
            orchestrator,
            shutdown,
        }
    }
}
