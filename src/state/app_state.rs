//! 应用状态
//!
//! 所有外部依赖通过 `Collaborators` 注入，不使用全局客户端

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::EnvConfig;
use crate::infra::{
    AwsSecretStore, AwsStackApiFactory, CommandRunner, HostResolver, ImdsClient, ImdsError,
    ProcessRunner, SecretStore, StackApiFactory,
};
use crate::services::deploy::{ArtifactLocks, FrontendDeployer};
use crate::services::provision::Provisioner;

/// 外部协作者
pub struct Collaborators {
    pub secrets: Arc<dyn SecretStore>,
    pub stacks: Arc<dyn StackApiFactory>,
    pub host_resolver: Arc<dyn HostResolver>,
    pub process_runner: Arc<dyn ProcessRunner>,
}

impl Collaborators {
    /// 基于 AWS SDK 和本机命令的默认实现
    pub async fn from_env_config(config: &EnvConfig) -> Result<Self, ImdsError> {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.aws.region.clone()))
            .load()
            .await;

        Ok(Self {
            secrets: Arc::new(AwsSecretStore::new(&sdk_config)),
            stacks: Arc::new(AwsStackApiFactory::new(config.aws.region.clone())),
            host_resolver: Arc::new(ImdsClient::new(
                config.imds.endpoint.clone(),
                config.imds.token_ttl_secs,
            )?),
            process_runner: Arc::new(CommandRunner),
        })
    }
}

/// 进行中的请求计数
#[derive(Debug, Default)]
pub struct ActivityCounter(AtomicUsize);

impl ActivityCounter {
    /// 计数加一，返回的 guard 释放时减一
    pub fn track(&self) -> ActivityGuard<'_> {
        self.0.fetch_add(1, Ordering::SeqCst);
        ActivityGuard(&self.0)
    }

    pub fn current(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct ActivityGuard<'a>(&'a AtomicUsize);

impl Drop for ActivityGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// 应用状态
pub struct AppState {
    /// 环境配置
    pub config: EnvConfig,
    /// 服务启动时间
    pub started_at: DateTime<Utc>,
    pub collaborators: Collaborators,
    /// 每个制品名的部署锁
    pub artifact_locks: ArtifactLocks,
    /// 进行中的建栈请求
    pub active_provisions: ActivityCounter,
    /// 进行中的前端部署
    pub active_deploys: ActivityCounter,
    /// shutdown token，取消所有进行中的轮询
    pub shutdown: CancellationToken,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(config: EnvConfig, collaborators: Collaborators) -> Self {
        tracing::info!(
            port = config.port,
            region = %config.aws.region,
            template_url = %config.provision.template_url,
            poll_interval_secs = config.provision.poll_interval_secs,
            poll_timeout_secs = config.provision.poll_timeout_secs,
            cloned_repos_dir = %config.deploy.cloned_repos_dir.display(),
            script = %config.deploy.script_path.display(),
            "Loaded configuration"
        );

        Self {
            config,
            started_at: Utc::now(),
            collaborators,
            artifact_locks: ArtifactLocks::new(),
            active_provisions: ActivityCounter::default(),
            active_deploys: ActivityCounter::default(),
            shutdown: CancellationToken::new(),
        }
    }

    /// 建栈服务
    pub fn provisioner(&self) -> Provisioner<'_> {
        Provisioner {
            secrets: self.collaborators.secrets.as_ref(),
            stacks: self.collaborators.stacks.as_ref(),
            aws: &self.config.aws,
            config: &self.config.provision,
        }
    }

    /// 前端部署服务
    pub fn deployer(&self) -> FrontendDeployer<'_> {
        FrontendDeployer {
            config: &self.config.deploy,
            runner: self.collaborators.process_runner.as_ref(),
            resolver: self.collaborators.host_resolver.as_ref(),
            locks: &self.artifact_locks,
        }
    }
}
