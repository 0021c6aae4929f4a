//! 前端部署相关领域模型

use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

use super::{required, ValidationError};

/// 缺少必填参数时的提示
pub const MISSING_DEPLOY_PARAMS: &str =
    "Missing required parameters: repoUrl, baseDir or environment.";

/// 部署前端请求
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployFrontendRequest {
    pub repo_url: Option<String>,
    pub base_dir: Option<String>,
    pub environment: Option<String>,
    /// 容器启动命令，未提供时使用配置中的默认值
    pub run_command: Option<String>,
}

impl DeployFrontendRequest {
    /// 校验请求并生成部署规格
    pub fn validate(self, default_run_command: &str) -> Result<FrontendSpec, ValidationError> {
        let (Some(repo_url), Some(base_dir), Some(environment)) = (
            required(self.repo_url),
            required(self.base_dir),
            required(self.environment),
        ) else {
            return Err(ValidationError::new(MISSING_DEPLOY_PARAMS));
        };

        if repo_url.starts_with('-') {
            return Err(ValidationError::new(format!(
                "Invalid repoUrl \"{}\".",
                repo_url
            )));
        }

        let base_dir = base_dir.trim_matches('/').to_string();
        if !is_contained_relative_path(&base_dir) {
            return Err(ValidationError::new(format!(
                "baseDir \"{}\" must be a relative path inside the repository.",
                base_dir
            )));
        }

        let run_command = required(self.run_command)
            .unwrap_or_else(|| default_run_command.to_string());
        let artifact = artifact_name(&repo_url, &base_dir);

        Ok(FrontendSpec {
            repo_url,
            base_dir,
            environment,
            run_command,
            artifact,
        })
    }
}

/// 校验后的前端部署规格
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrontendSpec {
    pub repo_url: String,
    pub base_dir: String,
    pub environment: String,
    pub run_command: String,
    /// 制品名（克隆目录名、镜像名、URL 路径）
    pub artifact: String,
}

/// 部署成功响应
#[derive(Debug, Serialize)]
pub struct DeployFrontendResponse {
    pub message: String,
    pub project: String,
    pub url: String,
}

impl DeployFrontendResponse {
    pub fn success(project: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            message: "Deployment successful".to_string(),
            project: project.into(),
            url: url.into(),
        }
    }
}

/// 从仓库地址生成仓库名
///
/// `https://github.com/Acme/Site.git` -> `acme-site`
pub fn generate_repo_name(repo_url: &str) -> String {
    let trimmed = repo_url.trim().trim_end_matches('/');

    // 去掉 scheme://host/ 或 scp 风格的 user@host:
    let path = if let Some((_, rest)) = trimmed.split_once("://") {
        rest.split_once('/').map(|(_, path)| path).unwrap_or(rest)
    } else if let Some((_, path)) = trimmed.split_once(':') {
        path
    } else {
        trimmed
    };

    let path = path.strip_suffix(".git").unwrap_or(path);
    path.trim_matches('/').replace('/', "-").to_lowercase()
}

/// 制品名：仓库名 + 子目录，全部小写，斜杠替换为 `-`
pub fn artifact_name(repo_url: &str, base_dir: &str) -> String {
    format!(
        "{}-{}",
        generate_repo_name(repo_url),
        base_dir.trim_matches('/')
    )
    .replace('/', "-")
    .to_lowercase()
}

fn is_contained_relative_path(path: &str) -> bool {
    let path = Path::new(path);
    path.components().next().is_some()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}
