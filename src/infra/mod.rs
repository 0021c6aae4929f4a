//! 基础设施模块
//!
//! 封装外部依赖（AWS SDK、元数据服务、命令执行等）

pub mod cloudformation;
pub mod command;
pub mod imds;
pub mod secrets;

pub use cloudformation::{AwsStackApiFactory, StackApi, StackApiError, StackApiFactory};
pub use command::{CommandError, CommandOutput, CommandRunner, ProcessRunner};
pub use imds::{HostResolver, ImdsClient, ImdsError};
pub use secrets::{AwsSecretStore, CloudCredentials, SecretError, SecretStore};
