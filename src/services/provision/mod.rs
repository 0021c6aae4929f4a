//! 数据库建栈服务
//!
//! 读取凭证 -> 提交建栈请求 -> 轮询直到终态

pub mod poller;

use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{AwsConfig, ProvisionConfig};
use crate::domain::database::DatabaseSpec;
use crate::domain::stack::{
    CreateStackRequest, DatabaseEndpoint, StackHandle, StackStatus, CAPABILITY_IAM,
};
use crate::infra::cloudformation::{StackApi, StackApiFactory};
use crate::infra::secrets::{resolve_credentials, SecretError, SecretStore};

pub use poller::{PollSettings, PollStep, StackPoller};

/// 建栈错误
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to retrieve secret: {0}")]
    SecretRetrieval(String),
    #[error("{0}")]
    SecretNotFound(String),
    #[error("failed to submit stack: {0}")]
    ProvisionSubmission(String),
    #[error("failed to describe stack: {0}")]
    StackQuery(String),
    #[error("stack reached terminal status {0}")]
    StackTerminalFailure(StackStatus),
    #[error("Unhandled stack status: {0}")]
    UnhandledStackStatus(String),
    #[error("stack {stack_id} not complete after {attempts} checks ({elapsed_secs}s)")]
    ProvisioningTimeout {
        stack_id: String,
        attempts: u32,
        elapsed_secs: u64,
    },
    #[error("provisioning cancelled: service is shutting down")]
    Cancelled,
}

impl ProvisionError {
    /// 返回给客户端的提示信息
    pub fn response_message(&self) -> String {
        match self {
            ProvisionError::SecretRetrieval(_) | ProvisionError::SecretNotFound(_) => {
                "Failed to load AWS secrets".to_string()
            }
            ProvisionError::ProvisionSubmission(_) => "Error creating stack".to_string(),
            ProvisionError::StackQuery(_) => "Error describing stack".to_string(),
            ProvisionError::StackTerminalFailure(status) => status
                .failure_message()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Unhandled stack status: {}", status)),
            ProvisionError::UnhandledStackStatus(raw) => format!("Unhandled stack status: {}", raw),
            ProvisionError::ProvisioningTimeout { .. } => {
                "Timed out waiting for stack creation".to_string()
            }
            ProvisionError::Cancelled => "Stack status polling was cancelled".to_string(),
        }
    }

    /// 终态失败时的原始栈状态
    pub fn stack_status(&self) -> Option<&str> {
        match self {
            ProvisionError::StackTerminalFailure(status) => Some(status.as_str()),
            ProvisionError::UnhandledStackStatus(raw) => Some(raw),
            _ => None,
        }
    }
}

impl From<SecretError> for ProvisionError {
    fn from(err: SecretError) -> Self {
        match err {
            SecretError::NotFound(_) => ProvisionError::SecretNotFound(err.to_string()),
            SecretError::Retrieval(message) => ProvisionError::SecretRetrieval(message),
        }
    }
}

/// 单次建栈请求的上下文，贯穿所有轮询
#[derive(Clone)]
pub struct ProvisionContext {
    /// 请求 ID（日志关联）
    pub request_id: String,
    pub stack_name: String,
    pub handle: StackHandle,
    /// 用本次请求凭证构造的客户端
    pub api: Arc<dyn StackApi>,
}

/// 构造 RDS 建栈请求
pub fn build_create_request(spec: &DatabaseSpec, config: &ProvisionConfig) -> CreateStackRequest {
    CreateStackRequest {
        stack_name: spec.stack_name(&config.stack_name_prefix),
        template_url: config.template_url.clone(),
        parameters: spec.stack_parameters(),
        capabilities: vec![CAPABILITY_IAM.to_string()],
    }
}

/// 数据库建栈服务
pub struct Provisioner<'a> {
    pub secrets: &'a dyn SecretStore,
    pub stacks: &'a dyn StackApiFactory,
    pub aws: &'a AwsConfig,
    pub config: &'a ProvisionConfig,
}

impl Provisioner<'_> {
    /// 创建数据库并等待完成
    pub async fn provision(
        &self,
        spec: &DatabaseSpec,
        request_id: &str,
        cancel: &CancellationToken,
    ) -> Result<DatabaseEndpoint, ProvisionError> {
        let credentials = resolve_credentials(self.secrets, &self.aws.credentials_secret_id)
            .await
            .inspect_err(|e| {
                error!(request_id, error = %e, "Failed to load AWS secrets");
            })?;

        let api = self.stacks.connect(&credentials);
        let ctx = self.submit(api, spec, request_id).await?;

        StackPoller::new(PollSettings::from_config(self.config))
            .wait(&ctx, cancel)
            .await
    }

    /// 提交建栈请求，不重试
    async fn submit(
        &self,
        api: Arc<dyn StackApi>,
        spec: &DatabaseSpec,
        request_id: &str,
    ) -> Result<ProvisionContext, ProvisionError> {
        let request = build_create_request(spec, self.config);

        let handle = api.create_stack(&request).await.map_err(|e| {
            error!(request_id, stack_name = %request.stack_name, error = %e, "Error creating stack");
            ProvisionError::ProvisionSubmission(e.to_string())
        })?;

        info!(
            request_id,
            stack_name = %request.stack_name,
            stack_id = %handle,
            "Stack creation submitted"
        );

        Ok(ProvisionContext {
            request_id: request_id.to_string(),
            stack_name: request.stack_name,
            handle,
            api,
        })
    }
}
