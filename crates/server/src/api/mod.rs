//! API 路由模块。
//!
//! 提供健康检查与作业评分接口。

pub mod grading;
pub mod state;

use std::sync::Arc;

use apgw_api_types::HealthCheckResponse;
use axum::{Json, Router, routing::get};

pub use grading::create_grading_router;
pub use state::AppState;

/// 创建完整的 API 路由。
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .merge(create_grading_router())
        .with_state(state)
}

async fn health() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse::ok())
}
