//! CloudFormation 栈相关领域模型
//!
//! 栈状态、输出与建栈请求，纯数据结构

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// 数据库连接地址的输出键
pub const OUTPUT_DB_ENDPOINT: &str = "DBEndpoint";
/// 数据库端口的输出键
pub const OUTPUT_DB_PORT: &str = "DBPort";

/// 建栈时声明的 IAM 能力
pub const CAPABILITY_IAM: &str = "CAPABILITY_IAM";

/// 栈句柄（编排 API 返回的 StackId）
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StackHandle(String);

impl StackHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 栈状态
///
/// 只列出轮询关心的状态，其余原样保存在 `Other` 中
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StackStatus {
    CreateInProgress,
    CreateComplete,
    RollbackInProgress,
    RollbackComplete,
    DeleteInProgress,
    DeleteComplete,
    Other(String),
}

impl StackStatus {
    /// 从 API 返回的状态字符串解析
    pub fn parse(raw: &str) -> Self {
        match raw {
            "CREATE_IN_PROGRESS" => StackStatus::CreateInProgress,
            "CREATE_COMPLETE" => StackStatus::CreateComplete,
            "ROLLBACK_IN_PROGRESS" => StackStatus::RollbackInProgress,
            "ROLLBACK_COMPLETE" => StackStatus::RollbackComplete,
            "DELETE_IN_PROGRESS" => StackStatus::DeleteInProgress,
            "DELETE_COMPLETE" => StackStatus::DeleteComplete,
            other => StackStatus::Other(other.to_string()),
        }
    }

    /// 转换为字符串
    pub fn as_str(&self) -> &str {
        match self {
            StackStatus::CreateInProgress => "CREATE_IN_PROGRESS",
            StackStatus::CreateComplete => "CREATE_COMPLETE",
            StackStatus::RollbackInProgress => "ROLLBACK_IN_PROGRESS",
            StackStatus::RollbackComplete => "ROLLBACK_COMPLETE",
            StackStatus::DeleteInProgress => "DELETE_IN_PROGRESS",
            StackStatus::DeleteComplete => "DELETE_COMPLETE",
            StackStatus::Other(raw) => raw,
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StackStatus::CreateInProgress)
    }

    /// 已知失败终态对应的提示信息
    pub fn failure_message(&self) -> Option<&'static str> {
        match self {
            StackStatus::RollbackInProgress => Some("Stack creation failed and is rolling back."),
            StackStatus::RollbackComplete => {
                Some("Stack creation failed and has rolled back completely.")
            }
            StackStatus::DeleteInProgress => {
                Some("Stack is being deleted. Please check the stack's status later.")
            }
            StackStatus::DeleteComplete => Some("Stack has been successfully deleted."),
            _ => None,
        }
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 栈输出（OutputKey -> OutputValue）
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackOutputs(HashMap<String, String>);

impl StackOutputs {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl FromIterator<(String, String)> for StackOutputs {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// 单次查询得到的栈快照
#[derive(Clone, Debug)]
pub struct StackSnapshot {
    pub status: StackStatus,
    pub outputs: StackOutputs,
}

/// 建栈成功后提取的数据库连接信息
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseEndpoint {
    pub endpoint: Option<String>,
    pub port: Option<String>,
}

impl DatabaseEndpoint {
    /// 从栈输出中提取，缺失的键保持为 None
    pub fn from_outputs(outputs: &StackOutputs) -> Self {
        Self {
            endpoint: outputs.get(OUTPUT_DB_ENDPOINT).map(str::to_string),
            port: outputs.get(OUTPUT_DB_PORT).map(str::to_string),
        }
    }
}

/// 模板参数
#[derive(Clone, PartialEq, Eq)]
pub struct StackParameter {
    pub key: String,
    pub value: String,
}

impl StackParameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

// 参数里有数据库密码，只输出键名
impl fmt::Debug for StackParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackParameter")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// 建栈请求
#[derive(Clone, Debug)]
pub struct CreateStackRequest {
    pub stack_name: String,
    pub template_url: String,
    pub parameters: Vec<StackParameter>,
    pub capabilities: Vec<String>,
}
