//! 前端部署服务
//!
//! 克隆仓库 -> 校验子目录 -> 解析公网地址 -> 执行容器脚本 -> 返回访问 URL

pub mod script;
pub mod workspace;

use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info};

use crate::config::DeployConfig;
use crate::domain::deploy::StageLog;
use crate::domain::frontend::FrontendSpec;
use crate::infra::command::{CommandError, ProcessRunner};
use crate::infra::imds::HostResolver;

pub use workspace::ArtifactLocks;

/// 部署错误
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("failed to prepare {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("git clone failed: {0}")]
    Clone(String),
    #[error("Base directory \"{0}\" does not exist in the cloned repository.")]
    MissingSubdirectory(String),
    #[error("failed to resolve public DNS: {0}")]
    MetadataResolution(String),
    #[error("container script failed: {0}")]
    ScriptExecution(String),
}

/// 部署结果
#[derive(Debug, Clone)]
pub struct Deployment {
    pub project: String,
    pub url: String,
    pub stages: StageLog,
}

/// 前端部署器
pub struct FrontendDeployer<'a> {
    pub config: &'a DeployConfig,
    pub runner: &'a dyn ProcessRunner,
    pub resolver: &'a dyn HostResolver,
    pub locks: &'a ArtifactLocks,
}

impl FrontendDeployer<'_> {
    /// 执行部署，任一步失败立即返回（不回滚已完成步骤）
    pub async fn deploy(
        &self,
        spec: &FrontendSpec,
        request_id: &str,
    ) -> Result<Deployment, DeployError> {
        let mut stages = StageLog::default();
        let result = self.run_stages(spec, request_id, &mut stages).await;

        match &result {
            Ok(url) => info!(
                request_id,
                artifact = %spec.artifact,
                url = %url,
                stages = ?stages.stages().iter().map(|s| (s.name, s.duration_ms)).collect::<Vec<_>>(),
                "Deployment successful"
            ),
            Err(e) => error!(
                request_id,
                artifact = %spec.artifact,
                stage = stages.current().unwrap_or("none"),
                error = %e,
                "Deployment error"
            ),
        }

        result.map(|url| Deployment {
            project: spec.artifact.clone(),
            url,
            stages,
        })
    }

    async fn run_stages(
        &self,
        spec: &FrontendSpec,
        request_id: &str,
        stages: &mut StageLog,
    ) -> Result<String, DeployError> {
        let root = &self.config.cloned_repos_dir;
        let clone_dir = root.join(&spec.artifact);

        // Stage 1: prepare workspace
        stages.begin("prepare_workspace");
        workspace::ensure_root(root).await.inspect_err(|e| fail(stages, e))?;
        let _guard = self.locks.acquire(&spec.artifact).await;
        workspace::ensure_absent(&clone_dir)
            .await
            .inspect_err(|e| fail(stages, e))?;
        stages.end(true, None);

        // Stage 2: git clone
        stages.begin("git_clone");
        info!(request_id, repo_url = %spec.repo_url, dir = %clone_dir.display(), "Cloning repository");
        self.clone_repository(spec, &clone_dir)
            .await
            .inspect_err(|e| fail(stages, e))?;
        stages.end(true, None);

        // Stage 3: verify base directory
        stages.begin("verify_base_dir");
        let target_dir = clone_dir.join(&spec.base_dir);
        if !workspace::is_dir(&target_dir).await {
            let err = DeployError::MissingSubdirectory(spec.base_dir.clone());
            fail(stages, &err);
            return Err(err);
        }
        stages.end(true, None);

        // Stage 4: resolve public DNS
        stages.begin("resolve_public_dns");
        let public_dns = self
            .resolver
            .public_hostname()
            .await
            .map_err(|e| DeployError::MetadataResolution(e.to_string()))
            .inspect_err(|e| fail(stages, e))?;
        stages.end(true, None);

        // Stage 5: containerization script
        stages.begin("run_script");
        let args = script::script_args(&self.config.script_path, spec, &target_dir, &public_dns);
        let stdout = script::execute(self.runner, &args, root, self.config.script_timeout())
            .await
            .inspect_err(|e| fail(stages, e))?;
        stages.end(true, None);
        if !stdout.trim().is_empty() {
            info!(request_id, artifact = %spec.artifact, output = %stdout.trim(), "Container script output");
        }

        Ok(format!("http://{}/{}", public_dns, spec.artifact))
    }

    async fn clone_repository(
        &self,
        spec: &FrontendSpec,
        clone_dir: &std::path::Path,
    ) -> Result<(), DeployError> {
        let args = vec![
            "clone".to_string(),
            "--".to_string(),
            spec.repo_url.clone(),
            clone_dir.display().to_string(),
        ];

        let output = self
            .runner
            .run("git", &args, &self.config.cloned_repos_dir, self.config.clone_timeout())
            .await
            .map_err(|e| match e {
                CommandError::Timeout(d) => DeployError::Clone(format!("timed out after {:?}", d)),
                other => DeployError::Clone(other.to_string()),
            })?;

        if output.success {
            Ok(())
        } else {
            Err(DeployError::Clone(output.failure_summary()))
        }
    }
}

fn fail(stages: &mut StageLog, err: &DeployError) {
    stages.end(false, Some(err.to_string()));
}
