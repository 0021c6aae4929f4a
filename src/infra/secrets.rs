//! 密钥解析
//!
//! 从 AWS Secrets Manager 读取部署凭证（JSON 格式的 secret string）

use async_trait::async_trait;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;
use tracing::{error, info};

/// 密钥读取错误
#[derive(Debug, Error)]
pub enum SecretError {
    /// 密钥存在但没有 secret string
    #[error("No secret string found for {0}")]
    NotFound(String),
    /// 访问密钥存储失败或内容无法解析
    #[error("{0}")]
    Retrieval(String),
}

/// 云凭证
#[derive(Clone, Deserialize)]
pub struct CloudCredentials {
    #[serde(rename = "AWS_ACCESS_KEY_ID")]
    pub access_key_id: String,
    #[serde(rename = "AWS_SECRET_ACCESS_KEY")]
    pub secret_access_key: String,
    #[serde(rename = "AWS_SESSION_TOKEN", default)]
    pub session_token: Option<String>,
}

impl fmt::Debug for CloudCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("session_token", &self.session_token.is_some())
            .finish_non_exhaustive()
    }
}

/// 密钥存储
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// 读取 secret string，密钥没有字符串值时返回 None
    async fn secret_string(&self, secret_id: &str) -> Result<Option<String>, SecretError>;
}

/// 读取并解析部署凭证
pub async fn resolve_credentials(
    store: &dyn SecretStore,
    secret_id: &str,
) -> Result<CloudCredentials, SecretError> {
    if secret_id.is_empty() {
        return Err(SecretError::Retrieval(
            "no credentials secret id configured".to_string(),
        ));
    }

    let raw = store
        .secret_string(secret_id)
        .await?
        .ok_or_else(|| SecretError::NotFound(secret_id.to_string()))?;

    serde_json::from_str(&raw).map_err(|e| {
        error!(secret_id, error = %e, "Secret payload is not a valid credential bundle");
        SecretError::Retrieval(format!("invalid credential payload: {}", e))
    })
}

/// AWS Secrets Manager 实现
#[derive(Clone)]
pub struct AwsSecretStore {
    client: aws_sdk_secretsmanager::Client,
}

impl AwsSecretStore {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_secretsmanager::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    async fn secret_string(&self, secret_id: &str) -> Result<Option<String>, SecretError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                error!(secret_id, error = %message, "Error retrieving secrets");
                SecretError::Retrieval(message)
            })?;

        info!(secret_id, "Loaded secret");
        Ok(output.secret_string().map(str::to_string))
    }
}
