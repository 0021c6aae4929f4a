//! 前端部署 API
//!
//! 包含 /deploy-frontend 端点

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use std::sync::Arc;
use tracing::Instrument;

use crate::domain::frontend::{DeployFrontendRequest, DeployFrontendResponse, MISSING_DEPLOY_PARAMS};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// 创建前端部署路由
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/deploy-frontend", post(deploy_frontend))
}

/// 克隆仓库并部署前端容器
///
/// POST /deploy-frontend
async fn deploy_frontend(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeployFrontendRequest>, JsonRejection>,
) -> ApiResult<Json<DeployFrontendResponse>> {
    // 请求体无法解析时同样按缺少参数处理
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "Rejected deploy request body");
        ApiError::bad_request(MISSING_DEPLOY_PARAMS)
    })?;
    let spec = request.validate(&state.config.deploy.run_command)?;

    let request_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!(
        "deploy_frontend",
        request_id = %request_id,
        artifact = %spec.artifact,
        environment = %spec.environment
    );
    let _active = state.active_deploys.track();

    let deployment = state
        .deployer()
        .deploy(&spec, &request_id)
        .instrument(span)
        .await?;

    Ok(Json(DeployFrontendResponse::success(
        deployment.project,
        deployment.url,
    )))
}
