//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, ProbeOverrides};
use crate::config::{unresolvable_endpoints, Config, ConfigLoader, SAMPLE_CONFIG};
use crate::error::{DomainVitalsError, Result};
use crate::health::{
    AvailabilityLedger, AvailabilityScheduler, HealthPolicy, HttpProbeExecutor, SchedulerConfig,
};
use crate::report::{AvailabilityReporter, ConsoleReporter, OutputFormat};
use crate::shutdown;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 根据子命令选择处理器
pub fn command_for(command: &Commands) -> Box<dyn Command> {
    match command {
        Commands::Start { .. } => Box::new(StartCommand),
        Commands::Check { .. } => Box::new(CheckCommand),
        Commands::Validate { .. } => Box::new(ValidateCommand),
        Commands::Init { .. } => Box::new(InitCommand),
    }
}

/// 加载配置并应用命令行覆盖项，覆盖后重新验证
async fn load_config(
    args: &Args,
    interval: Option<u64>,
    overrides: &ProbeOverrides,
) -> Result<Config> {
    let loader = ConfigLoader::new(true);
    let mut config = loader.load_from_file(args.get_config_path()).await?;

    if let Some(interval) = interval {
        config.global.check_interval_seconds = interval;
    }
    overrides.apply(&mut config.global);
    loader.validate(&config)?;

    Ok(config)
}

/// 按配置组装调度器
///
/// 账本在这里按端点集合注册好全部域名，之后由调度器独占写入。
pub fn build_scheduler(
    config: &Config,
    reporter: Arc<dyn AvailabilityReporter>,
) -> Result<AvailabilityScheduler> {
    let policy = HealthPolicy::new(config.global.latency_threshold());
    let executor = HttpProbeExecutor::new(config.global.request_timeout(), policy)?;
    let ledger = Arc::new(AvailabilityLedger::from_endpoints(&config.endpoints));

    Ok(AvailabilityScheduler::new(
        config.endpoints.clone(),
        Arc::new(executor),
        ledger,
        reporter,
        SchedulerConfig::from(&config.global),
    ))
}

/// 启动命令
pub struct StartCommand;

#[async_trait]
impl Command for StartCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Start {
            interval,
            overrides,
        } = &args.command
        else {
            return Ok(());
        };

        let config = load_config(args, *interval, overrides).await?;
        let reporter = Arc::new(ConsoleReporter::new(args.format));
        let scheduler = build_scheduler(&config, reporter)?;

        let (trigger, _) = shutdown::channel();
        let signal = shutdown::install_or_log(&trigger);

        let passes = scheduler.run(signal).await;
        info!("检测已停止，共完成 {} 轮", passes);
        Ok(())
    }
}

/// 单轮检测命令
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Check { overrides } = &args.command else {
            return Ok(());
        };

        let config = load_config(args, None, overrides).await?;
        let reporter = Arc::new(ConsoleReporter::new(args.format));
        let scheduler = build_scheduler(&config, reporter)?;

        let (trigger, _) = shutdown::channel();
        let signal = shutdown::install_or_log(&trigger);

        if scheduler.run_pass(&signal).await.is_none() {
            info!("检测被中断，未生成报告");
        }
        Ok(())
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate { config_path } = &args.command {
            let config_file = config_path
                .clone()
                .unwrap_or_else(|| args.get_config_path());

            self.validate_config_file(&config_file, args.format).await
        } else {
            Ok(())
        }
    }
}

impl ValidateCommand {
    /// 验证配置文件
    async fn validate_config_file(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let loader = ConfigLoader::new(true);
        let config = loader.load_from_file(config_path).await?;

        let ledger = AvailabilityLedger::from_endpoints(&config.endpoints);
        let unresolvable = unresolvable_endpoints(&config);

        match format {
            OutputFormat::Json => {
                let unresolvable: Vec<_> = unresolvable
                    .iter()
                    .map(|(name, reason)| serde_json::json!({ "name": name, "reason": reason }))
                    .collect();
                let summary = serde_json::json!({
                    "config": config_path.display().to_string(),
                    "valid": true,
                    "endpoints": config.endpoints.len(),
                    "domains": ledger.domains(),
                    "unresolvable": unresolvable,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            OutputFormat::Text => {
                println!("验证配置文件: {}", config_path.display());
                println!("✓ 配置文件验证通过");
                println!(
                    "✓ 找到 {} 个端点，{} 个域名",
                    config.endpoints.len(),
                    ledger.len()
                );
                for domain in ledger.domains() {
                    println!("  - {}", domain);
                }
                for (name, reason) in &unresolvable {
                    println!("⚠ 端点 {} 无法解析出域名: {}", name, reason);
                }
            }
        }

        Ok(())
    }
}

/// 初始化命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init { config_path, force } = &args.command {
            self.create_config_file(config_path, *force).await
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 写入示例配置文件
    async fn create_config_file(&self, config_path: &Path, force: bool) -> Result<()> {
        if config_path.exists() && !force {
            return Err(DomainVitalsError::Other(anyhow::anyhow!(
                "配置文件已存在: {}，使用 --force 参数覆盖",
                config_path.display()
            )));
        }

        if let Some(parent) = config_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        tokio::fs::write(config_path, SAMPLE_CONFIG).await?;

        println!("配置文件已创建: {}", config_path.display());
        println!("请编辑配置文件以添加需要检测的端点");

        Ok(())
    }
}
