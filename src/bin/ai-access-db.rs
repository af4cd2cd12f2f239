// AI 功能访问控制管理 CLI

use ai_access::config::ConfigLoader;
use ai_access::db::cli::{CliCommand, CliExecutor, parse_args, print_help};
use ai_access::logging::LoggingSetup;
use anyhow::Context;
use std::env;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    let config = ConfigLoader::init().context("加载配置失败")?;
    let _guard = LoggingSetup::init(&config.logging).context("初始化日志失败")?;

    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            error!("解析命令失败: {}", e);
            print_help();
            std::process::exit(2);
        }
    };

    if command == CliCommand::Config {
        ConfigLoader::print_summary(config);
        return Ok(());
    }

    let executor = CliExecutor::new(config.clone())
        .await
        .context("初始化 CLI 执行器失败")?;
    let result = executor.execute(command).await;
    executor.close().await.context("关闭数据库连接失败")?;
    result.context("执行命令失败")?;

    info!("命令执行完成");
    Ok(())
}
