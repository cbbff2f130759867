//! 探测结果数据结构
//!
//! 定义单次探测的结果类型、健康状态枚举和判定策略

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::time::Duration;

/// 视为健康的HTTP状态码区间
pub const HEALTHY_STATUS_RANGE: Range<u16> = 200..300;

/// 默认延迟阈值
pub const DEFAULT_LATENCY_THRESHOLD: Duration = Duration::from_millis(500);

/// 健康状态枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// 端点正常
    Up,
    /// 端点异常
    Down,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Up => write!(f, "正常"),
            HealthStatus::Down => write!(f, "异常"),
        }
    }
}

impl HealthStatus {
    /// 判断状态是否为健康
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Up)
    }
}

impl From<bool> for HealthStatus {
    fn from(healthy: bool) -> Self {
        if healthy {
            HealthStatus::Up
        } else {
            HealthStatus::Down
        }
    }
}

/// 健康判定策略：状态码区间加延迟阈值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    /// 延迟必须严格小于该值
    pub latency_threshold: Duration,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            latency_threshold: DEFAULT_LATENCY_THRESHOLD,
        }
    }
}

impl HealthPolicy {
    /// 使用指定延迟阈值创建策略
    pub fn new(latency_threshold: Duration) -> Self {
        Self { latency_threshold }
    }

    /// 对收到响应的探测进行分类
    ///
    /// 仅当状态码在 [200, 300) 内且延迟严格小于阈值时判定为健康。
    pub fn classify(&self, status_code: u16, latency: Duration) -> HealthStatus {
        (HEALTHY_STATUS_RANGE.contains(&status_code) && latency < self.latency_threshold).into()
    }
}

/// 单次探测结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// 端点名称
    pub endpoint_name: String,
    /// 探测的域名
    pub domain: String,
    /// 健康状态
    pub status: HealthStatus,
    /// 从发出请求到收到响应头的延迟，请求未完成时为空
    #[serde(with = "optional_duration_serde")]
    pub latency: Option<Duration>,
    /// HTTP状态码（收到响应时）
    pub status_code: Option<u16>,
    /// 请求未能完成的原因
    pub failure_reason: Option<String>,
    /// 探测时间戳
    pub timestamp: DateTime<Utc>,
}

impl ProbeOutcome {
    /// 创建新的探测结果
    pub fn new(endpoint_name: String, domain: String, status: HealthStatus) -> Self {
        Self {
            endpoint_name,
            domain,
            status,
            latency: None,
            status_code: None,
            failure_reason: None,
            timestamp: Utc::now(),
        }
    }

    /// 请求未能完成：判定为异常，不记录延迟
    pub fn failed(endpoint_name: String, domain: String, reason: String) -> Self {
        Self::new(endpoint_name, domain, HealthStatus::Down).with_failure(reason)
    }

    /// 设置HTTP状态码
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// 设置延迟
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// 设置失败原因
    pub fn with_failure(mut self, reason: String) -> Self {
        self.failure_reason = Some(reason);
        self
    }

    /// 是否健康
    pub fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }

    /// 延迟（毫秒）
    pub fn latency_ms(&self) -> Option<u64> {
        self.latency.map(|latency| latency.as_millis() as u64)
    }

    /// 异常原因的简短描述，健康时为空
    pub fn describe_problem(&self) -> Option<String> {
        if self.is_healthy() {
            return None;
        }
        if let Some(reason) = &self.failure_reason {
            return Some(reason.clone());
        }
        match (self.status_code, self.latency) {
            (Some(code), _) if !HEALTHY_STATUS_RANGE.contains(&code) => {
                Some(format!("HTTP {}", code))
            }
            (_, Some(latency)) => Some(format!("延迟 {}ms 超过阈值", latency.as_millis())),
            _ => None,
        }
    }
}

/// Option<Duration> 以毫秒序列化
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration
            .map(|d| d.as_millis() as u64)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Option::<u64>::deserialize(deserializer)?;
        Ok(millis.map(Duration::from_millis))
    }
}
