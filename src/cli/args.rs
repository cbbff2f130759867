//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use crate::config::{get_default_config_path, ConfigLoader, GlobalConfig};
use crate::logging::parse_level;
use crate::report::OutputFormat;
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

/// Domain Vitals - 按域名统计HTTP端点可用性
#[derive(Parser, Debug, Clone)]
#[command(
    name = "domain-vitals",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径",
        env = "DOMAIN_VITALS_CONFIG",
        global = true
    )]
    pub config: Option<PathBuf>,

    /// 日志级别，未指定时使用配置文件中的设置
    #[arg(
        short,
        long,
        value_enum,
        help = "日志级别",
        env = "DOMAIN_VITALS_LOG_LEVEL",
        global = true
    )]
    pub log_level: Option<LogLevel>,

    /// 以JSON格式输出日志
    #[arg(long, help = "以JSON格式输出日志", global = true)]
    pub json_logs: bool,

    /// 报告输出格式
    #[arg(
        long,
        value_enum,
        default_value = "text",
        help = "报告输出格式",
        global = true
    )]
    pub format: OutputFormat,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    /// 跟踪级别
    Trace,
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 覆盖配置文件中探测参数的选项
#[derive(clap::Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOverrides {
    /// 单次请求超时时间（秒）
    #[arg(
        short,
        long,
        value_name = "SECONDS",
        help = "单次请求超时时间（秒）",
        env = "DOMAIN_VITALS_TIMEOUT"
    )]
    pub timeout: Option<u64>,

    /// 健康延迟阈值（毫秒）
    #[arg(
        long,
        value_name = "MILLIS",
        help = "健康延迟阈值（毫秒）",
        env = "DOMAIN_VITALS_LATENCY_THRESHOLD"
    )]
    pub latency_threshold: Option<u64>,

    /// 最大并发检测数
    #[arg(
        long,
        value_name = "COUNT",
        help = "最大并发检测数",
        env = "DOMAIN_VITALS_MAX_CONCURRENT"
    )]
    pub max_concurrent: Option<usize>,
}

impl ProbeOverrides {
    /// 把命令行指定的值写入全局配置
    pub fn apply(&self, global: &mut GlobalConfig) {
        if let Some(timeout) = self.timeout {
            global.request_timeout_seconds = timeout;
        }
        if let Some(threshold) = self.latency_threshold {
            global.latency_threshold_ms = threshold;
        }
        if let Some(max_concurrent) = self.max_concurrent {
            global.max_concurrent_checks = max_concurrent;
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 持续检测并输出每轮的可用性报告
    Start {
        /// 检测间隔（秒）
        #[arg(
            short,
            long,
            value_name = "SECONDS",
            help = "检测间隔（秒）",
            env = "DOMAIN_VITALS_INTERVAL"
        )]
        interval: Option<u64>,

        #[command(flatten)]
        overrides: ProbeOverrides,
    },

    /// 执行一轮检测并输出报告
    Check {
        #[command(flatten)]
        overrides: ProbeOverrides,
    },

    /// 验证配置文件
    Validate {
        /// 配置文件路径
        #[arg(value_name = "FILE", help = "配置文件路径")]
        config_path: Option<PathBuf>,
    },

    /// 初始化配置文件
    Init {
        /// 配置文件路径
        #[arg(
            value_name = "FILE",
            help = "配置文件路径",
            default_value = "domain-vitals.toml"
        )]
        config_path: PathBuf,

        /// 是否覆盖现有文件
        #[arg(short, long, help = "覆盖现有文件")]
        force: bool,
    },
}

impl Args {
    /// 获取配置文件路径
    pub fn get_config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(get_default_config_path)
    }

    /// 实际使用的日志级别
    ///
    /// 命令行优先，其次是配置文件中的 `log_level`，都没有时为 info。
    pub fn effective_log_level(&self) -> LevelFilter {
        if let Some(level) = self.log_level {
            return level.into();
        }

        ConfigLoader::default()
            .peek_log_level(self.get_config_path())
            .and_then(|level| parse_level(&level))
            .unwrap_or(LevelFilter::Info)
    }
}
