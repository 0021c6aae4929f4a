//! 数据库创建相关领域模型

use serde::{Deserialize, Serialize};
use std::fmt;

use super::stack::{DatabaseEndpoint, StackParameter};
use super::{required, required_raw, ValidationError};

/// 创建数据库请求
///
/// 字段均为可选，缺失时在 `validate` 中拒绝
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatabaseRequest {
    pub db_instance_identifier: Option<String>,
    pub db_name: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
}

impl CreateDatabaseRequest {
    /// 校验必填字段
    pub fn validate(self) -> Result<DatabaseSpec, ValidationError> {
        match (
            required(self.db_instance_identifier),
            required_raw(self.db_name),
            required_raw(self.db_user),
            required_raw(self.db_password),
        ) {
            (Some(instance_identifier), Some(name), Some(user), Some(password)) => {
                Ok(DatabaseSpec {
                    instance_identifier,
                    name,
                    user,
                    password,
                })
            }
            _ => Err(ValidationError::new(
                "Missing required parameters: dbInstanceIdentifier, dbName, dbUser or dbPassword.",
            )),
        }
    }
}

/// 校验后的数据库规格
#[derive(Clone)]
pub struct DatabaseSpec {
    pub instance_identifier: String,
    pub name: String,
    pub user: String,
    pub password: String,
}

impl DatabaseSpec {
    /// 栈名：固定前缀 + 数据库用户名
    pub fn stack_name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.user)
    }

    /// RDS 模板参数
    pub fn stack_parameters(&self) -> Vec<StackParameter> {
        vec![
            StackParameter::new("DatabaseInstanceIdentifier", &self.instance_identifier),
            StackParameter::new("DatabaseName", &self.name),
            StackParameter::new("DatabaseUser", &self.user),
            StackParameter::new("DatabasePassword", &self.password),
        ]
    }
}

impl fmt::Debug for DatabaseSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSpec")
            .field("instance_identifier", &self.instance_identifier)
            .field("name", &self.name)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// 创建数据库成功响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatabaseResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

impl CreateDatabaseResponse {
    pub fn created(endpoint: DatabaseEndpoint) -> Self {
        Self {
            message: "Database created successfully!".to_string(),
            db_endpoint: endpoint.endpoint,
            port: endpoint.port,
        }
    }
}
