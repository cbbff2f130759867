//! 日志系统模块
//!
//! 基于 tracing-subscriber 的日志初始化。日志写到标准错误，标准输出留给可用性报告。

use log::LevelFilter;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 全局日志初始化状态
#[derive(Debug, Default)]
struct GlobalLoggingState {
    /// 是否已初始化
    initialized: bool,
    /// 初始化失败时的错误信息
    init_error: Option<String>,
}

/// 全局日志状态管理器
static GLOBAL_LOGGING_STATE: OnceLock<Mutex<GlobalLoggingState>> = OnceLock::new();

/// 日志配置结构
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别，`RUST_LOG` 中的指令会在此基础上叠加
    pub level: LevelFilter,
    /// 是否使用JSON格式
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            json_format: false,
        }
    }
}

/// 日志系统管理器
#[derive(Debug)]
pub struct LoggingSystem {
    config: LogConfig,
}

impl LoggingSystem {
    /// 初始化日志系统
    ///
    /// 全局只初始化一次，重复调用返回新的句柄而不重新安装 subscriber。
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        let mut state = lock_state();

        if state.initialized {
            if let Some(e) = &state.init_error {
                return Err(anyhow::anyhow!("日志系统之前初始化失败: {}", e));
            }
            return Ok(Self { config });
        }

        let init_result = Self::perform_initialization(&config);

        state.initialized = true;
        state.init_error = init_result.as_ref().err().map(|e| e.to_string());

        init_result.map(|()| Self { config })
    }

    /// 当前句柄使用的配置
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// 重置日志系统状态（主要用于测试）
    #[cfg(test)]
    pub fn reset_for_testing() {
        let mut state = lock_state();
        state.initialized = false;
        state.init_error = None;
    }

    fn perform_initialization(config: &LogConfig) -> anyhow::Result<()> {
        Self::init_log_tracer()?;
        Self::init_tracing_subscriber(config)
    }

    /// 初始化 LogTracer（log crate 到 tracing 的桥接）
    fn init_log_tracer() -> anyhow::Result<()> {
        use tracing_log::LogTracer;

        static LOG_TRACER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

        LOG_TRACER_INIT
            .get_or_init(|| match LogTracer::init() {
                Ok(()) => Ok(()),
                Err(e) if is_already_initialized(&e.to_string()) => Ok(()),
                Err(e) => Err(e.to_string()),
            })
            .as_ref()
            .map_err(|e| anyhow::anyhow!("LogTracer初始化失败: {}", e))?;
        Ok(())
    }

    fn init_tracing_subscriber(config: &LogConfig) -> anyhow::Result<()> {
        let env_filter = EnvFilter::builder()
            .with_default_directive(level_directive(config.level))
            .from_env_lossy();

        let fmt_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_file(true)
                .with_line_number(true)
                .boxed()
        } else {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_target(true)
                .boxed()
        };

        // LogTracer 已单独安装，这里只设置全局 subscriber
        let subscriber = registry().with(env_filter).with(fmt_layer);
        match tracing::subscriber::set_global_default(subscriber) {
            Ok(()) => {
                tracing::debug!("日志系统初始化完成: {:?}", config);
                Ok(())
            }
            Err(e) if is_already_initialized(&e.to_string()) => {
                // 测试中其他用例可能已经安装过全局 subscriber
                tracing::debug!("日志系统已经初始化过了");
                Ok(())
            }
            Err(e) => Err(anyhow::anyhow!("tracing subscriber初始化失败: {}", e)),
        }
    }
}

/// 重复安装 logger 或 subscriber 产生的错误不视为失败
fn is_already_initialized(error_msg: &str) -> bool {
    error_msg.contains("attempted to set a logger after the logging system was already initialized")
        || error_msg.contains("a global default trace dispatcher has already been set")
}

/// 将级别字符串解析为 `LevelFilter`
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    level.parse().ok()
}

fn lock_state() -> MutexGuard<'static, GlobalLoggingState> {
    GLOBAL_LOGGING_STATE
        .get_or_init(|| Mutex::new(GlobalLoggingState::default()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

fn level_directive(level: LevelFilter) -> Directive {
    match level {
        LevelFilter::Off => Directive::from(tracing::level_filters::LevelFilter::OFF),
        LevelFilter::Error => Directive::from(tracing::Level::ERROR),
        LevelFilter::Warn => Directive::from(tracing::Level::WARN),
        LevelFilter::Info => Directive::from(tracing::Level::INFO),
        LevelFilter::Debug => Directive::from(tracing::Level::DEBUG),
        LevelFilter::Trace => Directive::from(tracing::Level::TRACE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_setup_logging_from_fresh_state() {
        LoggingSystem::reset_for_testing();

        let system = LoggingSystem::setup_logging(LogConfig {
            level: LevelFilter::Debug,
            ..Default::default()
        });
        assert!(system.is_ok(), "setup failed: {:?}", system.err());

        // log crate 的记录经过桥接也不会出错
        log::info!("bridged through LogTracer");
    }

    #[test]
    #[serial]
    fn test_logging_system_single_initialization() {
        LoggingSystem::reset_for_testing();

        let first = LoggingSystem::setup_logging(LogConfig::default());
        assert!(first.is_ok());

        // 第二次初始化不会重复安装
        let second = LoggingSystem::setup_logging(LogConfig::default());
        assert!(second.is_ok());
    }

    #[test]
    #[serial]
    fn test_logging_system_with_json_format() {
        LoggingSystem::reset_for_testing();

        let config = LogConfig {
            json_format: true,
            ..Default::default()
        };

        let system = LoggingSystem::setup_logging(config).unwrap();
        assert!(system.config().json_format);
    }

    #[test]
    fn test_already_initialized_messages() {
        assert!(is_already_initialized(
            "attempted to set a logger after the logging system was already initialized"
        ));
        assert!(is_already_initialized(
            "a global default trace dispatcher has already been set"
        ));
        assert!(!is_already_initialized("permission denied"));
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level("WARN"), Some(LevelFilter::Warn));
        assert_eq!(parse_level("loud"), None);
    }
}
