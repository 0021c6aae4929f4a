//! EC2 实例元数据（IMDSv2）客户端
//!
//! 先 PUT 获取短期 token，再带 token 查询公网主机名

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

const TOKEN_PATH: &str = "/latest/api/token";
const PUBLIC_HOSTNAME_PATH: &str = "/latest/meta-data/public-hostname";
const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";

/// 元数据查询错误
#[derive(Debug, Error)]
pub enum ImdsError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("failed to fetch metadata token: {0}")]
    Token(#[source] reqwest::Error),
    #[error("failed to query public hostname: {0}")]
    Hostname(#[source] reqwest::Error),
    #[error("instance metadata returned an empty public hostname")]
    EmptyHostname,
}

/// 解析本机对外可达的地址
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn public_hostname(&self) -> Result<String, ImdsError>;
}

/// IMDSv2 客户端
#[derive(Clone)]
pub struct ImdsClient {
    client: Client,
    endpoint: String,
    token_ttl_secs: u64,
}

impl ImdsClient {
    /// 创建新的元数据客户端
    ///
    /// # Arguments
    /// * `endpoint` - 元数据服务地址（默认 http://169.254.169.254）
    /// * `token_ttl_secs` - token 有效期
    pub fn new(endpoint: impl Into<String>, token_ttl_secs: u64) -> Result<Self, ImdsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(ImdsError::Client)?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token_ttl_secs,
        })
    }

    async fn fetch_token(&self) -> Result<String, ImdsError> {
        self.client
            .put(format!("{}{}", self.endpoint, TOKEN_PATH))
            .header(TOKEN_TTL_HEADER, self.token_ttl_secs.to_string())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(ImdsError::Token)?
            .text()
            .await
            .map_err(ImdsError::Token)
    }
}

#[async_trait]
impl HostResolver for ImdsClient {
    async fn public_hostname(&self) -> Result<String, ImdsError> {
        let token = self.fetch_token().await.inspect_err(|e| {
            error!(error = %e, "Failed to retrieve EC2 metadata token");
        })?;

        let hostname = self
            .client
            .get(format!("{}{}", self.endpoint, PUBLIC_HOSTNAME_PATH))
            .header(TOKEN_HEADER, token.trim())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(ImdsError::Hostname)?
            .text()
            .await
            .map_err(ImdsError::Hostname)?;

        let hostname = hostname.trim().to_string();
        if hostname.is_empty() {
            return Err(ImdsError::EmptyHostname);
        }

        info!(public_dns = %hostname, "Resolved public DNS");
        Ok(hostname)
    }
}
