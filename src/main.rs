//! Domain Vitals 主程序入口
//!
//! 周期性探测HTTP端点并按域名输出可用性

use anyhow::{Context, Result};
use clap::Parser;
use domain_vitals::cli::{command_for, Args};
use domain_vitals::logging::{LogConfig, LoggingSystem};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 初始化日志系统，日志写到标准错误
    let log_config = LogConfig {
        level: args.effective_log_level(),
        json_format: args.json_logs,
    };

    let _logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!("Domain Vitals v{} 启动", domain_vitals::VERSION);

    if let Err(e) = execute_command(&args).await {
        error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 执行CLI命令
async fn execute_command(args: &Args) -> Result<()> {
    command_for(&args.command)
        .execute(args)
        .await
        .context("命令执行失败")
}
