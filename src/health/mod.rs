//! 健康检测模块
//!
//! 提供域名解析、HTTP探测、可用性账本和轮询调度功能

pub mod checker;
pub mod domain;
pub mod ledger;
pub mod result;
pub mod scheduler;

// 重新导出主要类型
pub use checker::{HttpProbeExecutor, ProbeExecutor, DEFAULT_REQUEST_TIMEOUT};
pub use domain::resolve_domain;
pub use ledger::{AvailabilityLedger, AvailabilitySnapshot, DomainAvailability, DomainCounters};
pub use result::{HealthPolicy, HealthStatus, ProbeOutcome};
pub use scheduler::{AvailabilityScheduler, SchedulerConfig, SchedulerPhase, SchedulerStatus};
