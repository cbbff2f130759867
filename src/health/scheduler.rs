//! 轮询调度器
//!
//! 按固定间隔对全部端点执行一轮探测，每轮结束后生成可用性报告。
//! 轮内探测并发执行（受信号量限制），全部完成后才进入报告阶段。

use crate::config::{EndpointSpec, GlobalConfig};
use crate::health::checker::ProbeExecutor;
use crate::health::ledger::AvailabilityLedger;
use crate::health::result::ProbeOutcome;
use crate::report::{AvailabilityReport, AvailabilityReporter, PassSummary};
use crate::shutdown::ShutdownSignal;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, Semaphore};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// 调度器参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// 报告之后到下一轮开始之间的空闲时间
    pub check_interval: Duration,
    /// 单轮内最大并发探测数
    pub max_concurrent_checks: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        GlobalConfig::default().into()
    }
}

impl From<&GlobalConfig> for SchedulerConfig {
    fn from(config: &GlobalConfig) -> Self {
        Self {
            check_interval: config.check_interval(),
            max_concurrent_checks: config.max_concurrent_checks.max(1),
        }
    }
}

impl From<GlobalConfig> for SchedulerConfig {
    fn from(config: GlobalConfig) -> Self {
        Self::from(&config)
    }
}

/// 调度器阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerPhase {
    /// 尚未开始
    Pending,
    /// 正在探测端点
    Polling,
    /// 正在生成并交付报告
    Reporting,
    /// 报告已交付，等待下一轮
    Waiting,
    /// 已停止
    Stopped,
}

/// 调度器状态
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    /// 当前阶段
    pub phase: SchedulerPhase,
    /// 端点数量
    pub total_endpoints: usize,
    /// 已完成轮次
    pub passes_completed: u64,
    /// 最近一轮完成时间
    pub last_pass_at: Option<DateTime<Utc>>,
    /// 最近一轮汇总
    pub last_summary: Option<PassSummary>,
}

/// 单个端点在一轮中的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeDisposition {
    Healthy,
    Unhealthy,
    ResolutionFailure,
    LedgerFailure,
}

/// 可用性调度器
///
/// 端点列表和账本在创建时确定，运行期间不会变化。
pub struct AvailabilityScheduler {
    /// 端点列表
    endpoints: Arc<[EndpointSpec]>,
    /// 探测执行器
    executor: Arc<dyn ProbeExecutor>,
    /// 可用性账本
    ledger: Arc<AvailabilityLedger>,
    /// 报告器
    reporter: Arc<dyn AvailabilityReporter>,
    /// 调度参数
    config: SchedulerConfig,
    /// 并发控制信号量
    semaphore: Arc<Semaphore>,
    /// 调度器状态
    status: Arc<RwLock<SchedulerStatus>>,
}

impl AvailabilityScheduler {
    /// 创建新的调度器
    ///
    /// # 参数
    /// * `endpoints` - 端点列表，按此顺序探测
    /// * `executor` - 探测执行器
    /// * `ledger` - 已按端点集合注册过域名的账本
    /// * `reporter` - 报告器
    /// * `config` - 调度参数
    pub fn new(
        endpoints: Vec<EndpointSpec>,
        executor: Arc<dyn ProbeExecutor>,
        ledger: Arc<AvailabilityLedger>,
        reporter: Arc<dyn AvailabilityReporter>,
        config: SchedulerConfig,
    ) -> Self {
        let status = SchedulerStatus {
            phase: SchedulerPhase::Pending,
            total_endpoints: endpoints.len(),
            passes_completed: 0,
            last_pass_at: None,
            last_summary: None,
        };

        Self {
            endpoints: endpoints.into(),
            executor,
            ledger,
            reporter,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_checks.max(1))),
            config,
            status: Arc::new(RwLock::new(status)),
        }
    }

    /// 可用性账本
    pub fn ledger(&self) -> &Arc<AvailabilityLedger> {
        &self.ledger
    }

    /// 获取调度器状态
    pub async fn status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }

    /// 持续轮询直到收到关闭信号
    ///
    /// 空闲等待和进行中的探测都会在收到信号后立即结束；被中断的一轮不生成报告。
    ///
    /// # 返回
    /// * `u64` - 已完成的轮次
    pub async fn run(&self, shutdown: ShutdownSignal) -> u64 {
        info!(
            "启动可用性调度器，端点数量: {}，检测间隔: {:?}",
            self.endpoints.len(),
            self.config.check_interval
        );

        while !shutdown.is_triggered() {
            if self.run_pass(&shutdown).await.is_none() {
                break;
            }

            self.set_phase(SchedulerPhase::Waiting).await;
            tokio::select! {
                _ = tokio::time::sleep(self.config.check_interval) => {}
                _ = shutdown.cancelled() => {
                    debug!("空闲等待期间收到关闭信号");
                    break;
                }
            }
        }

        self.set_phase(SchedulerPhase::Stopped).await;
        let passes = self.status.read().await.passes_completed;
        info!("可用性调度器已停止，完成轮次: {}", passes);
        passes
    }

    /// 执行一轮：探测全部端点，然后生成并交付报告
    ///
    /// # 返回
    /// * `Some(AvailabilityReport)` - 本轮报告
    /// * `None` - 本轮被关闭信号中断
    pub async fn run_pass(&self, shutdown: &ShutdownSignal) -> Option<AvailabilityReport> {
        self.set_phase(SchedulerPhase::Polling).await;

        let summary = self.poll_endpoints(shutdown).await?;

        self.set_phase(SchedulerPhase::Reporting).await;
        let report = {
            let mut status = self.status.write().await;
            status.passes_completed += 1;

            let report = AvailabilityReport {
                pass: status.passes_completed,
                generated_at: Utc::now(),
                summary,
                availability: self.ledger.snapshot(),
            };

            status.last_pass_at = Some(report.generated_at);
            status.last_summary = Some(report.summary.clone());
            report
        };

        info!(
            "第 {} 轮检测完成: 健康 {}，异常 {}，解析失败 {}，耗时 {:?}",
            report.pass,
            report.summary.healthy,
            report.summary.unhealthy,
            report.summary.resolution_failures,
            report.summary.duration
        );

        self.reporter.report(&report);
        Some(report)
    }

    /// 并发探测全部端点并汇总，收到关闭信号时放弃本轮
    async fn poll_endpoints(&self, shutdown: &ShutdownSignal) -> Option<PassSummary> {
        let start_time = Instant::now();
        let probes = join_all(
            self.endpoints
                .iter()
                .map(|endpoint| self.probe_endpoint(endpoint)),
        );

        tokio::select! {
            dispositions = probes => {
                Some(summarize(&dispositions, start_time.elapsed()))
            }
            _ = shutdown.cancelled() => {
                info!("检测过程中收到关闭信号，放弃本轮");
                None
            }
        }
    }

    /// 探测单个端点并记入账本
    async fn probe_endpoint(&self, endpoint: &EndpointSpec) -> ProbeDisposition {
        // 信号量不会被关闭
        let _permit = self.semaphore.acquire().await.ok();

        debug!("开始检测端点: {}", endpoint.name);

        let outcome = match self.executor.probe(endpoint).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("端点 {} 的目标地址无法解析出域名，本轮结果不计入: {}", endpoint.name, e);
                return ProbeDisposition::ResolutionFailure;
            }
        };

        log_outcome(&outcome);

        match self.ledger.record(&outcome.domain, outcome.is_healthy()) {
            Ok(_) if outcome.is_healthy() => ProbeDisposition::Healthy,
            Ok(_) => ProbeDisposition::Unhealthy,
            Err(e) => {
                error!("可用性账本不一致，端点 {} 的结果未记录: {}", endpoint.name, e);
                ProbeDisposition::LedgerFailure
            }
        }
    }

    async fn set_phase(&self, phase: SchedulerPhase) {
        self.status.write().await.phase = phase;
    }
}

fn log_outcome(outcome: &ProbeOutcome) {
    if outcome.is_healthy() {
        debug!(
            "端点检测正常: {} ({}) {}ms",
            outcome.endpoint_name,
            outcome.domain,
            outcome.latency_ms().unwrap_or_default()
        );
    } else {
        warn!(
            "端点检测异常: {} ({}), {}",
            outcome.endpoint_name,
            outcome.domain,
            outcome
                .describe_problem()
                .unwrap_or_else(|| "N/A".to_string())
        );
    }
}

fn summarize(dispositions: &[ProbeDisposition], duration: Duration) -> PassSummary {
    let mut summary = PassSummary {
        duration,
        ..Default::default()
    };

    for disposition in dispositions {
        match disposition {
            ProbeDisposition::Healthy => {
                summary.probed += 1;
                summary.healthy += 1;
            }
            ProbeDisposition::Unhealthy => {
                summary.probed += 1;
                summary.unhealthy += 1;
            }
            ProbeDisposition::ResolutionFailure => summary.resolution_failures += 1,
            ProbeDisposition::LedgerFailure => summary.ledger_failures += 1,
        }
    }

    summary
}
