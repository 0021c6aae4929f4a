//! 命令执行器
//!
//! 提供统一的命令执行接口，支持：
//! - 超时控制（超时后终止子进程）
//! - stdout/stderr 分离

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{info, warn};

/// 命令执行错误
#[derive(Debug)]
pub enum CommandError {
    /// 命令启动失败
    SpawnFailed(std::io::Error),
    /// 命令超时
    Timeout(Duration),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::SpawnFailed(e) => write!(f, "Failed to spawn command: {}", e),
            CommandError::Timeout(d) => write!(f, "Command timed out after {:?}", d),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::SpawnFailed(e) => Some(e),
            _ => None,
        }
    }
}

/// 命令执行结果
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// 退出码（被信号终止时为 None）
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// 失败描述，包含退出码与输出
    pub fn failure_summary(&self) -> String {
        format!(
            "exit code {}\nSTDOUT: {}\nSTDERR: {}",
            self.code.map_or_else(|| "none".to_string(), |c| c.to_string()),
            self.stdout.trim(),
            self.stderr.trim()
        )
    }
}

/// 外部进程执行接口
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// 执行程序并等待完成
    async fn run(
        &self,
        program: &str,
        args: &[String],
        work_dir: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError>;
}

/// 基于 tokio::process 的命令执行器
#[derive(Debug, Clone, Default)]
pub struct CommandRunner;

#[async_trait]
impl ProcessRunner for CommandRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        work_dir: &Path,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        info!(program, args = ?args, work_dir = %work_dir.display(), "Executing command");

        let child = Command::new(program)
            .args(args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::select! {
            result = child => result.map_err(CommandError::SpawnFailed)?,
            _ = tokio::time::sleep(timeout) => {
                warn!(program, timeout = ?timeout, "Command timed out, killing process");
                return Err(CommandError::Timeout(timeout));
            }
        };

        Ok(CommandOutput {
            code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
