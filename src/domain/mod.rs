//! 领域模型模块
//!
//! 纯数据结构，不依赖 axum/tokio

pub mod database;
pub mod deploy;
pub mod frontend;
pub mod stack;

use thiserror::Error;

// Re-exports for convenience
pub use database::{CreateDatabaseRequest, CreateDatabaseResponse, DatabaseSpec};
pub use deploy::{DeployStage, StageStatus};
pub use frontend::{DeployFrontendRequest, DeployFrontendResponse, FrontendSpec};
pub use stack::{
    CreateStackRequest, DatabaseEndpoint, StackHandle, StackOutputs, StackParameter,
    StackSnapshot, StackStatus,
};

/// 请求校验失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// 必填字段：空字符串视为缺失
pub(crate) fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 必填字段：仅在判断缺失时忽略空白，原值原样保留
pub(crate) fn required_raw(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
