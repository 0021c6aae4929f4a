//! 环境变量配置加载

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// 环境配置
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// 服务监听端口
    pub port: u16,
    /// AWS 配置
    pub aws: AwsConfig,
    /// 建栈与轮询配置
    pub provision: ProvisionConfig,
    /// 前端部署配置
    pub deploy: DeployConfig,
    /// 实例元数据服务配置
    pub imds: ImdsConfig,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            aws: AwsConfig::default(),
            provision: ProvisionConfig::default(),
            deploy: DeployConfig::default(),
            imds: ImdsConfig::default(),
        }
    }
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: parse_env_or("PORT", defaults.port),
            aws: AwsConfig::from_env(),
            provision: ProvisionConfig::from_env(),
            deploy: DeployConfig::from_env(),
            imds: ImdsConfig::from_env(),
        }
    }
}

/// AWS 配置
#[derive(Clone, Debug)]
pub struct AwsConfig {
    pub region: String,
    /// 存放部署凭证的 Secrets Manager secret id / ARN
    pub credentials_secret_id: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            credentials_secret_id: String::new(),
        }
    }
}

impl AwsConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let credentials_secret_id = env_or("AWS_CREDENTIALS_SECRET_ID", "");
        if credentials_secret_id.is_empty() {
            warn!("AWS_CREDENTIALS_SECRET_ID is not set, /create-database will fail");
        }

        Self {
            region: env_or("AWS_REGION", &defaults.region),
            credentials_secret_id,
        }
    }
}

/// 轮询间隔与总时长的下限（秒）
const MIN_POLL_SECS: u64 = 1;

/// 建栈配置
#[derive(Clone, Debug)]
pub struct ProvisionConfig {
    /// RDS 模板地址
    pub template_url: String,
    /// 栈名前缀（栈名 = 前缀 + 数据库用户名）
    pub stack_name_prefix: String,
    pub poll_interval_secs: u64,
    /// 等待栈完成的总时长上限
    pub poll_timeout_secs: u64,
    /// 最大查询次数，0 表示只受总时长限制
    pub poll_max_attempts: u32,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            template_url: "https://cloud-term-assignment-bucket.s3.amazonaws.com/rds.yaml"
                .to_string(),
            stack_name_prefix: "RDS-".to_string(),
            poll_interval_secs: 10,
            poll_timeout_secs: 1800,
            poll_max_attempts: 0,
        }
    }
}

impl ProvisionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            template_url: env_or("RDS_TEMPLATE_URL", &defaults.template_url),
            stack_name_prefix: env_or("STACK_NAME_PREFIX", &defaults.stack_name_prefix),
            poll_interval_secs: parse_env_or("STACK_POLL_INTERVAL_SECS", defaults.poll_interval_secs)
                .max(MIN_POLL_SECS),
            poll_timeout_secs: parse_env_or("STACK_POLL_TIMEOUT_SECS", defaults.poll_timeout_secs)
                .max(MIN_POLL_SECS),
            poll_max_attempts: parse_env_or("STACK_POLL_MAX_ATTEMPTS", defaults.poll_max_attempts),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(MIN_POLL_SECS))
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs.max(MIN_POLL_SECS))
    }
}

/// 前端部署配置
#[derive(Clone, Debug)]
pub struct DeployConfig {
    /// 克隆仓库的根目录
    pub cloned_repos_dir: PathBuf,
    /// 构建并启动容器的脚本
    pub script_path: PathBuf,
    /// 请求未指定 runCommand 时使用
    pub run_command: String,
    pub clone_timeout_secs: u64,
    pub script_timeout_secs: u64,
}

impl Default for DeployConfig {
    fn default() -> Self {
        let cloned_repos_dir = dirs::home_dir()
            .unwrap_or_else(env::temp_dir)
            .join("cloned_repos");

        Self {
            cloned_repos_dir,
            script_path: PathBuf::from("./create_frontend_docker_container.sh"),
            run_command: "npm start".to_string(),
            clone_timeout_secs: 300,
            script_timeout_secs: 1800,
        }
    }
}

impl DeployConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cloned_repos_dir: env::var_os("CLONED_REPOS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cloned_repos_dir),
            script_path: env::var_os("FRONTEND_DOCKER_SCRIPT")
                .map(PathBuf::from)
                .unwrap_or(defaults.script_path),
            run_command: env_or("FRONTEND_RUN_COMMAND", &defaults.run_command),
            clone_timeout_secs: parse_env_or("GIT_CLONE_TIMEOUT_SECS", defaults.clone_timeout_secs),
            script_timeout_secs: parse_env_or(
                "DEPLOY_SCRIPT_TIMEOUT_SECS",
                defaults.script_timeout_secs,
            ),
        }
    }

    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs)
    }
}

/// 实例元数据服务配置
#[derive(Clone, Debug)]
pub struct ImdsConfig {
    pub endpoint: String,
    pub token_ttl_secs: u64,
}

impl Default for ImdsConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://169.254.169.254".to_string(),
            token_ttl_secs: 21600,
        }
    }
}

impl ImdsConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: env_or("IMDS_ENDPOINT", &defaults.endpoint),
            token_ttl_secs: parse_env_or("IMDS_TOKEN_TTL_SECS", defaults.token_ttl_secs),
        }
    }
}

/// 读取字符串环境变量，未设置或为空时使用默认值
fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// 解析环境变量，无法解析时告警并使用默认值
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default = ?default, "Invalid environment value, using default");
            default
        }),
        Err(_) => default,
    }
}

/// 常量
pub mod constants {
    /// 服务名
    pub const SERVICE_NAME: &str = "cloud-deploy-agent";

    /// 版本号
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}
