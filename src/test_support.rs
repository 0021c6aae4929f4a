//! 测试用的假协作者与请求辅助函数

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use crate::config::EnvConfig;
use crate::domain::stack::{CreateStackRequest, StackHandle, StackSnapshot, StackStatus};
use crate::infra::{
    CloudCredentials, CommandError, CommandOutput, HostResolver, ImdsError, ProcessRunner,
    SecretError, SecretStore, StackApi, StackApiError, StackApiFactory,
};
use crate::state::{AppState, Collaborators};

pub const TEST_STACK_ID: &str = "stack-1";

/// 构造一个栈快照
pub fn snapshot(status: &str, outputs: &[(&str, &str)]) -> StackSnapshot {
    StackSnapshot {
        status: StackStatus::parse(status),
        outputs: outputs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

pub fn credentials_json() -> String {
    serde_json::json!({
        "AWS_ACCESS_KEY_ID": "AKIATEST",
        "AWS_SECRET_ACCESS_KEY": "secret",
    })
    .to_string()
}

/// 按脚本依次返回查询结果的编排 API，脚本耗尽后重复最后一项
pub struct ScriptedStackApi {
    script: Vec<Result<StackSnapshot, String>>,
    reject_submit: Option<String>,
    describe_calls: AtomicUsize,
    handles: Mutex<Vec<String>>,
    submitted: Mutex<Vec<String>>,
}

impl ScriptedStackApi {
    pub fn new(script: Vec<Result<StackSnapshot, String>>) -> Self {
        Self {
            script,
            reject_submit: None,
            describe_calls: AtomicUsize::new(0),
            handles: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// 建栈请求直接被拒绝
    pub fn rejecting(message: &str) -> Self {
        Self {
            reject_submit: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn handles_seen(&self) -> Vec<String> {
        self.handles.lock().unwrap().clone()
    }

    pub fn submitted_stack_names(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl StackApi for ScriptedStackApi {
    async fn create_stack(&self, request: &CreateStackRequest) -> Result<StackHandle, StackApiError> {
        if let Some(message) = &self.reject_submit {
            return Err(StackApiError::Submit(message.clone()));
        }
        self.submitted
            .lock()
            .unwrap()
            .push(request.stack_name.clone());
        Ok(StackHandle::new(TEST_STACK_ID))
    }

    async fn describe_stack(&self, handle: &StackHandle) -> Result<StackSnapshot, StackApiError> {
        let call = self.describe_calls.fetch_add(1, Ordering::SeqCst);
        self.handles.lock().unwrap().push(handle.as_str().to_string());

        let Some(last) = self.script.len().checked_sub(1) else {
            return Err(StackApiError::StackNotFound(handle.as_str().to_string()));
        };
        match &self.script[call.min(last)] {
            Ok(snapshot) => Ok(snapshot.clone()),
            Err(message) => Err(StackApiError::Describe(message.clone())),
        }
    }
}

/// 总是返回同一个 `ScriptedStackApi` 的工厂，记录使用过的 access key
pub struct FakeStackFactory {
    api: Arc<ScriptedStackApi>,
    connected: Mutex<Vec<String>>,
}

impl FakeStackFactory {
    pub fn new(api: Arc<ScriptedStackApi>) -> Self {
        Self {
            api,
            connected: Mutex::new(Vec::new()),
        }
    }

    pub fn connected_with(&self) -> Vec<String> {
        self.connected.lock().unwrap().clone()
    }
}

impl StackApiFactory for FakeStackFactory {
    fn connect(&self, credentials: &CloudCredentials) -> Arc<dyn StackApi> {
        self.connected
            .lock()
            .unwrap()
            .push(credentials.access_key_id.clone());
        self.api.clone()
    }
}

enum SecretBehavior {
    Secret(String),
    Empty,
    Failing(String),
}

/// 内存密钥存储
pub struct FakeSecretStore {
    behavior: SecretBehavior,
    calls: AtomicUsize,
}

impl FakeSecretStore {
    fn with_behavior(behavior: SecretBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_secret(secret: String) -> Self {
        Self::with_behavior(SecretBehavior::Secret(secret))
    }

    /// 密钥存在但没有 secret string
    pub fn empty() -> Self {
        Self::with_behavior(SecretBehavior::Empty)
    }

    pub fn failing(message: &str) -> Self {
        Self::with_behavior(SecretBehavior::Failing(message.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for FakeSecretStore {
    async fn secret_string(&self, _secret_id: &str) -> Result<Option<String>, SecretError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            SecretBehavior::Secret(s) => Ok(Some(s.clone())),
            SecretBehavior::Empty => Ok(None),
            SecretBehavior::Failing(m) => Err(SecretError::Retrieval(m.clone())),
        }
    }
}

/// 记录命令的进程执行器
///
/// `git clone -- <url> <dir>` 会创建 `<dir>` 以及预设的子目录
pub struct FakeRunner {
    subdirs: Vec<String>,
    failing_program: Option<(String, String)>,
    script_failure: Option<String>,
    commands: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakeRunner {
    pub fn cloning_with(subdirs: &[&str]) -> Self {
        Self {
            subdirs: subdirs.iter().map(|s| s.to_string()).collect(),
            failing_program: None,
            script_failure: None,
            commands: Mutex::new(Vec::new()),
        }
    }

    /// 指定程序以非零状态退出
    pub fn failing(program: &str, stderr: &str) -> Self {
        Self {
            failing_program: Some((program.to_string(), stderr.to_string())),
            ..Self::cloning_with(&[])
        }
    }

    pub fn with_script_failure(mut self, stderr: &str) -> Self {
        self.script_failure = Some(stderr.to_string());
        self
    }

    pub fn commands(&self) -> Vec<(String, Vec<String>)> {
        self.commands.lock().unwrap().clone()
    }

    fn failed(stderr: &str) -> CommandOutput {
        CommandOutput {
            code: Some(1),
            success: false,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        _work_dir: &Path,
        _timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        self.commands
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));

        if let Some((failing, stderr)) = &self.failing_program {
            if failing == program {
                return Ok(Self::failed(stderr));
            }
        }

        match program {
            "git" => {
                let clone_dir = PathBuf::from(&args[3]);
                std::fs::create_dir_all(&clone_dir).map_err(CommandError::SpawnFailed)?;
                for sub in &self.subdirs {
                    std::fs::create_dir_all(clone_dir.join(sub))
                        .map_err(CommandError::SpawnFailed)?;
                }
            }
            "bash" => {
                if let Some(stderr) = &self.script_failure {
                    return Ok(Self::failed(stderr));
                }
            }
            _ => {}
        }

        Ok(CommandOutput {
            code: Some(0),
            success: true,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

/// 固定地址的主机解析器
pub struct FakeResolver {
    hostname: Option<String>,
    calls: AtomicUsize,
}

impl FakeResolver {
    pub fn ok(hostname: &str) -> Self {
        Self {
            hostname: Some(hostname.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            hostname: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostResolver for FakeResolver {
    async fn public_hostname(&self) -> Result<String, ImdsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.hostname.clone().ok_or(ImdsError::EmptyHostname)
    }
}

/// 组装测试用的 `AppState`
pub struct TestStateBuilder {
    config: EnvConfig,
    secrets: Arc<dyn SecretStore>,
    stack_api: Arc<ScriptedStackApi>,
    runner: Arc<dyn ProcessRunner>,
    resolver: Arc<dyn HostResolver>,
}

impl TestStateBuilder {
    pub fn new() -> Self {
        let mut config = EnvConfig::default();
        config.aws.credentials_secret_id = "test_aws_cred".to_string();
        config.deploy.cloned_repos_dir = std::env::temp_dir()
            .join(format!("cloned_repos-{}", uuid::Uuid::new_v4()));

        Self {
            config,
            secrets: Arc::new(FakeSecretStore::with_secret(credentials_json())),
            stack_api: Arc::new(ScriptedStackApi::new(Vec::new())),
            runner: Arc::new(FakeRunner::cloning_with(&[])),
            resolver: Arc::new(FakeResolver::ok("localhost")),
        }
    }

    pub fn secrets(self, secrets: FakeSecretStore) -> Self {
        self.shared_secrets(Arc::new(secrets))
    }

    pub fn shared_secrets(mut self, secrets: Arc<FakeSecretStore>) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn stack_api(mut self, api: Arc<ScriptedStackApi>) -> Self {
        self.stack_api = api;
        self
    }

    pub fn runner(self, runner: FakeRunner) -> Self {
        self.shared_runner(Arc::new(runner))
    }

    pub fn shared_runner(mut self, runner: Arc<FakeRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn resolver(self, resolver: FakeResolver) -> Self {
        self.shared_resolver(Arc::new(resolver))
    }

    pub fn shared_resolver(mut self, resolver: Arc<FakeResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn cloned_repos_dir(mut self, dir: PathBuf) -> Self {
        self.config.deploy.cloned_repos_dir = dir;
        self
    }

    pub fn build(self) -> Arc<AppState> {
        let collaborators = Collaborators {
            secrets: self.secrets,
            stacks: Arc::new(FakeStackFactory::new(self.stack_api)),
            host_resolver: self.resolver,
            process_runner: self.runner,
        };
        Arc::new(AppState::new(self.config, collaborators))
    }

    pub fn router(self) -> Router {
        crate::api::router(self.build())
    }
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
