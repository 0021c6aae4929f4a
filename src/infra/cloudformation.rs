//! CloudFormation 客户端
//!
//! 封装建栈与查询栈状态，每个请求使用独立凭证构造客户端

use async_trait::async_trait;
use aws_sdk_cloudformation::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_cloudformation::error::DisplayErrorContext;
use aws_sdk_cloudformation::types::{Capability, Parameter, Stack};
use std::sync::Arc;
use thiserror::Error;

use crate::domain::stack::{
    CreateStackRequest, StackHandle, StackOutputs, StackSnapshot, StackStatus,
};
use crate::infra::secrets::CloudCredentials;

/// 编排 API 错误
#[derive(Debug, Error)]
pub enum StackApiError {
    /// 建栈请求被拒绝
    #[error("{0}")]
    Submit(String),
    /// 请求被接受但没有返回 StackId
    #[error("create-stack response did not include a stack id")]
    MissingStackId,
    /// 查询失败
    #[error("{0}")]
    Describe(String),
    /// 查询结果中没有与句柄对应的栈
    #[error("stack {0} not found in describe-stacks response")]
    StackNotFound(String),
}

/// 编排 API
#[async_trait]
pub trait StackApi: Send + Sync {
    /// 提交建栈请求，返回栈句柄
    async fn create_stack(&self, request: &CreateStackRequest) -> Result<StackHandle, StackApiError>;

    /// 查询栈当前状态与输出
    async fn describe_stack(&self, handle: &StackHandle) -> Result<StackSnapshot, StackApiError>;
}

/// 按凭证构造编排 API 客户端
pub trait StackApiFactory: Send + Sync {
    fn connect(&self, credentials: &CloudCredentials) -> Arc<dyn StackApi>;
}

/// AWS CloudFormation 实现
#[derive(Clone)]
pub struct AwsStackApi {
    client: aws_sdk_cloudformation::Client,
}

#[async_trait]
impl StackApi for AwsStackApi {
    async fn create_stack(&self, request: &CreateStackRequest) -> Result<StackHandle, StackApiError> {
        let mut builder = self
            .client
            .create_stack()
            .stack_name(&request.stack_name)
            .template_url(&request.template_url);

        for param in &request.parameters {
            builder = builder.parameters(
                Parameter::builder()
                    .parameter_key(&param.key)
                    .parameter_value(&param.value)
                    .build(),
            );
        }
        for capability in &request.capabilities {
            builder = builder.capabilities(Capability::from(capability.as_str()));
        }

        let output = builder
            .send()
            .await
            .map_err(|e| StackApiError::Submit(DisplayErrorContext(&e).to_string()))?;

        output
            .stack_id()
            .map(StackHandle::new)
            .ok_or(StackApiError::MissingStackId)
    }

    async fn describe_stack(&self, handle: &StackHandle) -> Result<StackSnapshot, StackApiError> {
        let output = self
            .client
            .describe_stacks()
            .stack_name(handle.as_str())
            .send()
            .await
            .map_err(|e| StackApiError::Describe(DisplayErrorContext(&e).to_string()))?;

        // 只接受 StackId 与句柄一致的栈
        output
            .stacks()
            .iter()
            .find(|stack| stack.stack_id() == Some(handle.as_str()))
            .map(snapshot)
            .ok_or_else(|| StackApiError::StackNotFound(handle.to_string()))
    }
}

fn snapshot(stack: &Stack) -> StackSnapshot {
    let status = stack
        .stack_status()
        .map(|s| StackStatus::parse(s.as_str()))
        .unwrap_or_else(|| StackStatus::Other("UNKNOWN".to_string()));

    let outputs: StackOutputs = stack
        .outputs()
        .iter()
        .filter_map(|o| Some((o.output_key()?.to_string(), o.output_value()?.to_string())))
        .collect();

    StackSnapshot { status, outputs }
}

/// 使用 Secrets Manager 中的凭证构造客户端
#[derive(Debug, Clone)]
pub struct AwsStackApiFactory {
    region: String,
}

impl AwsStackApiFactory {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }
}

impl StackApiFactory for AwsStackApiFactory {
    fn connect(&self, credentials: &CloudCredentials) -> Arc<dyn StackApi> {
        let provider = Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            credentials.session_token.clone(),
            None,
            "secrets-manager",
        );
        let config = aws_sdk_cloudformation::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .credentials_provider(provider)
            .build();

        Arc::new(AwsStackApi {
            client: aws_sdk_cloudformation::Client::from_conf(config),
        })
    }
}
