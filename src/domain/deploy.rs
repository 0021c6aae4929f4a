//! 部署阶段领域模型

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 阶段状态
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Running,
    Success,
    Failed,
}

/// 部署阶段信息
#[derive(Clone, Debug, Serialize)]
pub struct DeployStage {
    /// 阶段标识 (e.g., "git_clone", "run_script")
    pub name: &'static str,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// 持续时间（毫秒）
    pub duration_ms: Option<i64>,
    pub status: StageStatus,
    /// 失败原因
    pub message: Option<String>,
}

impl DeployStage {
    /// 开始执行阶段
    pub fn start(name: &'static str) -> Self {
        Self {
            name,
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: None,
            status: StageStatus::Running,
            message: None,
        }
    }

    /// 完成阶段
    pub fn finish(&mut self, success: bool, message: Option<String>) {
        let now = Utc::now();
        self.finished_at = Some(now);
        self.status = if success {
            StageStatus::Success
        } else {
            StageStatus::Failed
        };
        self.message = message;
        self.duration_ms = Some((now - self.started_at).num_milliseconds());
    }
}

/// 按顺序执行的一组阶段
#[derive(Clone, Debug, Default, Serialize)]
pub struct StageLog {
    stages: Vec<DeployStage>,
}

impl StageLog {
    /// 开始一个新阶段
    pub fn begin(&mut self, name: &'static str) {
        self.stages.push(DeployStage::start(name));
    }

    /// 结束最近开始的阶段
    pub fn end(&mut self, success: bool, message: Option<String>) {
        if let Some(stage) = self.stages.last_mut() {
            stage.finish(success, message);
        }
    }

    pub fn stages(&self) -> &[DeployStage] {
        &self.stages
    }

    /// 最后一个阶段的名称
    pub fn current(&self) -> Option<&'static str> {
        self.stages.last().map(|s| s.name)
    }
}
