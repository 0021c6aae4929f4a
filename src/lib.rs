//! Cloud Deploy Agent - 数据库建栈与前端部署服务
//!
//! 库入口：模块声明与服务启动

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod services;
pub mod state;

#[cfg(test)]
mod test_support;

use anyhow::Context;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::env::constants::{SERVICE_NAME, VERSION};
use crate::config::EnvConfig;
use crate::state::{AppState, Collaborators};

/// 命令行传入的运行时配置
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// 覆盖 PORT 环境变量
    pub port_override: Option<u16>,
}

/// 加载配置、组装依赖并运行 HTTP 服务，直到收到退出信号
pub async fn init_and_run_agent_with_config(runtime: RuntimeConfig) -> anyhow::Result<()> {
    let mut config = EnvConfig::from_env();
    if let Some(port) = runtime.port_override {
        config.port = port;
    }

    info!(service = SERVICE_NAME, version = VERSION, "Starting agent");

    let collaborators = Collaborators::from_env_config(&config)
        .await
        .context("failed to initialize instance metadata client")?;
    let port = config.port;
    let state = Arc::new(AppState::new(config, collaborators));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {}", port))?;
    info!(port, "Server is running");

    let app = api::router(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.shutdown.clone()))
        .await
        .context("HTTP server error")?;

    info!("Agent stopped");
    Ok(())
}

/// 等待 Ctrl+C / SIGTERM，然后取消所有进行中的轮询
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }

    cancel.cancel();
}
