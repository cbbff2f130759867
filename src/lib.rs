//! Domain Vitals - 按域名统计HTTP端点可用性
//!
//! 周期性探测一组配置好的HTTP端点，根据状态码和延迟判定健康状态，
//! 并按域名累计整个运行期间的可用性百分比：
//! - 并发探测，单次请求有超时上限
//! - 按域名聚合的可用性账本
//! - 可取消的轮询调度
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod report;
pub mod shutdown;

// 重新导出主要类型
pub use config::{Config, EndpointSpec, GlobalConfig};
pub use error::DomainVitalsError;
pub use health::{AvailabilityLedger, AvailabilityScheduler, HttpProbeExecutor, ProbeOutcome};
pub use report::{AvailabilityReport, AvailabilityReporter};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
