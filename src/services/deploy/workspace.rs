//! 克隆目录管理
//!
//! 根目录幂等创建、目标目录清理、按制品名串行化

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use super::DeployError;

/// 确保克隆根目录存在（并发创建不会报错）
pub async fn ensure_root(dir: &Path) -> Result<(), DeployError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| DeployError::Workspace {
            path: dir.to_path_buf(),
            source,
        })
}

/// 确保目标目录不存在，存在则递归删除
pub async fn ensure_absent(dir: &Path) -> Result<(), DeployError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            info!(dir = %dir.display(), "Removed existing clone directory");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(DeployError::Workspace {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

/// 路径是否为目录
pub async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

/// 按制品名加锁，同一制品的删除、克隆、构建串行执行
#[derive(Default)]
pub struct ArtifactLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ArtifactLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取制品锁，持有期间其他同名部署等待
    pub async fn acquire(&self, artifact: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // 清理已无人持有的锁
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(artifact.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
