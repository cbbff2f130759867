//! 可用性报告
//!
//! 每轮检测结束后由调度器生成报告，交给报告器渲染或转发

use crate::health::ledger::AvailabilitySnapshot;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

/// 输出格式
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// 每个域名一行文本
    #[default]
    Text,
    /// 每轮一个JSON对象
    Json,
}

/// 单轮检测的汇总
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
    /// 完成探测并记入账本的端点数
    pub probed: usize,
    /// 健康次数
    pub healthy: usize,
    /// 异常次数
    pub unhealthy: usize,
    /// 目标地址无法解析的端点数
    pub resolution_failures: usize,
    /// 域名未注册导致无法记账的次数
    pub ledger_failures: usize,
    /// 本轮耗时
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

/// 一轮检测完成后的可用性报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityReport {
    /// 轮次，从1开始
    pub pass: u64,
    /// 生成时间
    pub generated_at: DateTime<Utc>,
    /// 本轮汇总
    pub summary: PassSummary,
    /// 截至本轮的累计可用性
    pub availability: AvailabilitySnapshot,
}

impl AvailabilityReport {
    /// 文本形式，每个域名一行
    pub fn lines(&self) -> Vec<String> {
        self.availability
            .iter()
            .map(|(domain, entry)| format!("{} has {}% availability", domain, entry.percent))
            .collect()
    }

    /// 按指定格式渲染
    pub fn render(&self, format: OutputFormat) -> crate::error::Result<String> {
        match format {
            OutputFormat::Text => Ok(self.lines().join("\n")),
            OutputFormat::Json => Ok(serde_json::to_string(self)?),
        }
    }
}

/// 报告器trait，消费每轮的可用性报告
pub trait AvailabilityReporter: Send + Sync {
    /// 处理一份报告
    fn report(&self, report: &AvailabilityReport);
}

/// 输出到标准输出的报告器
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    format: OutputFormat,
}

impl ConsoleReporter {
    /// 创建新的控制台报告器
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl AvailabilityReporter for ConsoleReporter {
    fn report(&self, report: &AvailabilityReport) {
        match report.render(self.format) {
            Ok(rendered) if rendered.is_empty() => {}
            Ok(rendered) => println!("{}", rendered),
            Err(e) => warn!("渲染可用性报告失败: {}", e),
        }
    }
}

/// 通过通道转发报告的报告器，供嵌入方自行处理
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    sender: mpsc::UnboundedSender<AvailabilityReport>,
}

impl ChannelReporter {
    /// 创建报告器和对应的接收端
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AvailabilityReport>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl AvailabilityReporter for ChannelReporter {
    fn report(&self, report: &AvailabilityReport) {
        if self.sender.send(report.clone()).is_err() {
            warn!("报告接收端已关闭，丢弃第 {} 轮报告", report.pass);
        }
    }
}

/// Duration 以毫秒序列化
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::ledger::DomainAvailability;

    fn sample_report() -> AvailabilityReport {
        let mut availability = AvailabilitySnapshot::new();
        availability.insert(
            "b.example.com".to_string(),
            DomainAvailability {
                up: 1,
                down: 1,
                percent: 50,
            },
        );
        availability.insert(
            "a.example.com".to_string(),
            DomainAvailability {
                up: 3,
                down: 0,
                percent: 100,
            },
        );

        AvailabilityReport {
            pass: 3,
            generated_at: Utc::now(),
            summary: PassSummary {
                probed: 2,
                healthy: 1,
                unhealthy: 1,
                duration: Duration::from_millis(120),
                ..Default::default()
            },
            availability,
        }
    }

    #[test]
    fn test_text_lines_sorted_by_domain() {
        let report = sample_report();
        assert_eq!(
            report.lines(),
            vec![
                "a.example.com has 100% availability".to_string(),
                "b.example.com has 50% availability".to_string(),
            ]
        );
    }

    #[test]
    fn test_render_json() {
        let report = sample_report();
        let json = report.render(OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["pass"], 3);
        assert_eq!(value["summary"]["duration"], 120);
        assert_eq!(value["availability"]["b.example.com"]["percent"], 50);
    }

    #[test]
    fn test_render_empty_text() {
        let mut report = sample_report();
        report.availability.clear();
        assert_eq!(report.render(OutputFormat::Text).unwrap(), "");
    }

    #[tokio::test]
    async fn test_channel_reporter_forwards() {
        let (reporter, mut receiver) = ChannelReporter::new();
        reporter.report(&sample_report());

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.pass, 3);
        assert_eq!(received.availability.len(), 2);
    }

    #[test]
    fn test_channel_reporter_closed_receiver() {
        let (reporter, receiver) = ChannelReporter::new();
        drop(receiver);
        // 接收端关闭不会 panic
        reporter.report(&sample_report());
    }
}
