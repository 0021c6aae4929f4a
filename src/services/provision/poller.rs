//! 栈状态轮询
//!
//! 立即查询一次；`CREATE_IN_PROGRESS` 时等待固定间隔后再查，其余状态立即结束。
//! 等待期间不阻塞线程，总时长和查询次数都有上限。

use std::time::Duration;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ProvisionConfig;
use crate::domain::stack::{DatabaseEndpoint, StackSnapshot, StackStatus};

use super::{ProvisionContext, ProvisionError};

/// 轮询参数
#[derive(Clone, Debug)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
    /// 0 表示不限次数
    pub max_attempts: u32,
}

impl PollSettings {
    pub fn from_config(config: &ProvisionConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            timeout: config.poll_timeout(),
            max_attempts: config.poll_max_attempts,
        }
    }
}

/// 单次查询后的处理结果
#[derive(Debug)]
pub enum PollStep {
    /// 仍在创建，需要再次查询
    Pending,
    /// 创建完成
    Ready(DatabaseEndpoint),
    /// 失败终态
    Failed(ProvisionError),
}

/// 将栈状态映射为处理结果
pub fn evaluate(snapshot: &StackSnapshot) -> PollStep {
    match &snapshot.status {
        StackStatus::CreateInProgress => PollStep::Pending,
        StackStatus::CreateComplete => {
            PollStep::Ready(DatabaseEndpoint::from_outputs(&snapshot.outputs))
        }
        StackStatus::RollbackInProgress
        | StackStatus::RollbackComplete
        | StackStatus::DeleteInProgress
        | StackStatus::DeleteComplete => {
            PollStep::Failed(ProvisionError::StackTerminalFailure(snapshot.status.clone()))
        }
        StackStatus::Other(raw) => {
            PollStep::Failed(ProvisionError::UnhandledStackStatus(raw.clone()))
        }
    }
}

/// 栈状态轮询器
#[derive(Clone, Debug)]
pub struct StackPoller {
    settings: PollSettings,
}

impl StackPoller {
    pub fn new(settings: PollSettings) -> Self {
        Self { settings }
    }

    /// 等待栈进入终态
    ///
    /// 每次查询都使用 `ctx` 中同一个句柄和客户端，结果只返回一次
    pub async fn wait(
        &self,
        ctx: &ProvisionContext,
        cancel: &CancellationToken,
    ) -> Result<DatabaseEndpoint, ProvisionError> {
        let started = Instant::now();
        // 超出 Instant 表示范围时不设截止时间
        let deadline = started.checked_add(self.settings.timeout);
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            let snapshot = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ProvisionError::Cancelled),
                _ = until_deadline(deadline) => return Err(self.timed_out(ctx, attempts, started)),
                result = ctx.api.describe_stack(&ctx.handle) => result.map_err(|e| {
                    warn!(request_id = %ctx.request_id, stack_id = %ctx.handle, error = %e, "Error describing stack");
                    ProvisionError::StackQuery(e.to_string())
                })?,
            };

            match evaluate(&snapshot) {
                PollStep::Ready(endpoint) => {
                    info!(
                        request_id = %ctx.request_id,
                        stack_name = %ctx.stack_name,
                        stack_id = %ctx.handle,
                        attempts,
                        "Stack is created now"
                    );
                    return Ok(endpoint);
                }
                PollStep::Failed(err) => {
                    warn!(
                        request_id = %ctx.request_id,
                        stack_name = %ctx.stack_name,
                        stack_id = %ctx.handle,
                        status = %snapshot.status,
                        "Stack creation failed"
                    );
                    return Err(err);
                }
                PollStep::Pending => {}
            }

            if self.settings.max_attempts > 0 && attempts >= self.settings.max_attempts {
                return Err(self.timed_out(ctx, attempts, started));
            }

            info!(
                request_id = %ctx.request_id,
                stack_id = %ctx.handle,
                attempt = attempts,
                status = %snapshot.status,
                "Stack is still being created"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ProvisionError::Cancelled),
                _ = until_deadline(deadline) => return Err(self.timed_out(ctx, attempts, started)),
                _ = sleep(self.settings.interval) => {}
            }
        }
    }

    fn timed_out(&self, ctx: &ProvisionContext, attempts: u32, started: Instant) -> ProvisionError {
        let elapsed_secs = started.elapsed().as_secs();
        warn!(
            request_id = %ctx.request_id,
            stack_name = %ctx.stack_name,
            stack_id = %ctx.handle,
            attempts,
            elapsed_secs,
            "Gave up waiting for stack"
        );
        ProvisionError::ProvisioningTimeout {
            stack_id: ctx.handle.to_string(),
            attempts,
            elapsed_secs,
        }
    }
}

async fn until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
