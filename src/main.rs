//! Cloud Deploy Agent - 数据库建栈与前端部署服务
//!
//! Usage:
//! - Normal mode: `cloud-deploy-agent`
//! - With custom port: `cloud-deploy-agent --port 8080`

use cloud_deploy_agent::RuntimeConfig;
use tracing_subscriber::EnvFilter;

/// 解析命令行参数
fn parse_args() -> RuntimeConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = RuntimeConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" if i + 1 < args.len() => {
                config.port_override = args[i + 1].parse().ok();
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                i += 1;
            }
        }
    }

    config
}

fn print_help() {
    println!("Cloud Deploy Agent - 数据库建栈与前端部署服务");
    println!();
    println!("USAGE:");
    println!("    cloud-deploy-agent [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --port <PORT>    Override the listening port (default: $PORT or 5000)");
    println!("    -h, --help       Print help information");
    println!();
    println!("ENVIRONMENT:");
    println!("    AWS_REGION, AWS_CREDENTIALS_SECRET_ID, RDS_TEMPLATE_URL,");
    println!("    CLONED_REPOS_DIR, FRONTEND_DOCKER_SCRIPT, RUST_LOG, ...");
}

fn main() {
    let config = parse_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cloud_deploy_agent=info,tower_http=info")),
        )
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(cloud_deploy_agent::init_and_run_agent_with_config(config)) {
        eprintln!("Agent exited with error: {:#}", e);
        std::process::exit(1);
    }
}
