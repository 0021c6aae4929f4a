//! 统一错误处理
//!
//! 提供 `ApiError` 枚举实现 `IntoResponse`，在 handler 边界把领域错误转换为 JSON 响应

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::ValidationError;
use crate::services::deploy::DeployError;
use crate::services::provision::ProvisionError;

/// API 错误响应结构
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub error: String,
    /// 栈终态（仅建栈失败时）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            message: None,
            error: error.into(),
            status: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// 统一 API 错误类型
#[derive(Debug)]
pub enum ApiError {
    /// 400 - 请求无效（缺少字段、JSON 无法解析）
    BadRequest(String),
    /// 500/503 - 建栈失败
    Provision(ProvisionError),
    /// 500 - 部署失败
    Deploy(DeployError),
}

impl ApiError {
    /// 创建请求无效错误
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Provision(ProvisionError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Provision(_) | ApiError::Deploy(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<ProvisionError> for ApiError {
    fn from(err: ProvisionError) -> Self {
        Self::Provision(err)
    }
}

impl From<DeployError> for ApiError {
    fn from(err: DeployError) -> Self {
        Self::Deploy(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            ApiError::BadRequest(msg) => ErrorResponse::new(msg),
            ApiError::Provision(err) => {
                let mut body =
                    ErrorResponse::new(err.to_string()).with_message(err.response_message());
                if let Some(stack_status) = err.stack_status() {
                    body = body.with_status(stack_status);
                }
                body
            }
            ApiError::Deploy(err) => ErrorResponse::new(format!("Deployment failed: {}", err)),
        };

        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(m) => write!(f, "Bad request: {}", m),
            ApiError::Provision(e) => write!(f, "Provisioning failed: {}", e),
            ApiError::Deploy(e) => write!(f, "Deployment failed: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}

/// 便捷类型别名
pub type ApiResult<T> = Result<T, ApiError>;
