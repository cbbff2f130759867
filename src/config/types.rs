//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体和验证逻辑

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// 主配置结构，包含全局配置和端点列表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// 全局配置项
    #[serde(default)]
    pub global: GlobalConfig,
    /// 端点配置列表（顺序即每轮检测顺序）
    #[serde(default)]
    pub endpoints: Vec<EndpointSpec>,
}

/// 全局配置结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    /// 两轮检测之间的空闲时间（秒）
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
    /// 单次请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    /// 延迟阈值（毫秒），响应延迟必须严格小于该值才视为健康
    #[serde(default = "default_latency_threshold")]
    pub latency_threshold_ms: u64,
    /// 单轮检测内的最大并发数
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_checks: usize,
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: default_check_interval(),
            request_timeout_seconds: default_timeout(),
            latency_threshold_ms: default_latency_threshold(),
            max_concurrent_checks: default_max_concurrent(),
            log_level: default_log_level(),
        }
    }
}

impl GlobalConfig {
    /// 两轮检测之间的空闲时间
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    /// 单次请求超时时间
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// 健康延迟阈值
    pub fn latency_threshold(&self) -> Duration {
        Duration::from_millis(self.latency_threshold_ms)
    }
}

/// 端点配置，加载后只读
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointSpec {
    /// 端点名称
    pub name: String,
    /// 目标URL
    pub url: String,
    /// HTTP方法，为空时按GET处理
    #[serde(default, deserialize_with = "null_as_default")]
    pub method: String,
    /// 请求头
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: HashMap<String, String>,
    /// 请求体，为空时不发送
    #[serde(default, deserialize_with = "null_as_default")]
    pub body: String,
}

impl EndpointSpec {
    /// 创建一个GET端点
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            method: String::new(),
            headers: HashMap::new(),
            body: String::new(),
        }
    }

    /// 设置HTTP方法
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// 添加请求头
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// 设置请求体
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// 实际使用的HTTP方法
    ///
    /// 空值视为GET。方法名统一转为大写后发送，`post` 和 `POST` 是同一个请求；
    /// 因此区分大小写的扩展方法无法按原样发出。
    pub fn effective_method(&self) -> String {
        let method = self.method.trim();
        if method.is_empty() {
            "GET".to_string()
        } else {
            method.to_uppercase()
        }
    }
}

/// YAML 中写了键但没有值（`headers:`）时按默认值处理
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// 默认值函数
fn default_check_interval() -> u64 {
    15
}
fn default_timeout() -> u64 {
    5
}
fn default_latency_threshold() -> u64 {
    500
}
fn default_max_concurrent() -> usize {
    32
}
fn default_log_level() -> String {
    "info".to_string()
}

/// 配置验证函数
///
/// 目标URL能否解析出域名不在这里检查：解析失败的端点会在每轮检测中
/// 作为独立的解析错误上报，而不是阻止启动。
///
/// # 参数
/// * `config` - 要验证的配置
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &Config) -> Result<(), String> {
    // 验证全局配置
    if config.global.check_interval_seconds == 0 {
        return Err("检测间隔不能为0".to_string());
    }

    if config.global.request_timeout_seconds == 0 {
        return Err("请求超时时间不能为0".to_string());
    }

    if config.global.latency_threshold_ms == 0 {
        return Err("延迟阈值不能为0".to_string());
    }

    if config.global.max_concurrent_checks == 0 {
        return Err("最大并发检测数不能为0".to_string());
    }

    let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&config.global.log_level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            config.global.log_level, valid_log_levels
        ));
    }

    if config.endpoints.is_empty() {
        return Err("至少需要配置一个端点".to_string());
    }

    for endpoint in &config.endpoints {
        if endpoint.name.trim().is_empty() {
            return Err("端点名称不能为空".to_string());
        }

        if endpoint.url.trim().is_empty() {
            return Err(format!("端点 {} 的URL不能为空", endpoint.name));
        }

        let method = endpoint.effective_method();
        if reqwest::Method::from_bytes(method.as_bytes()).is_err() {
            return Err(format!(
                "端点 {} 的HTTP方法 {} 无效",
                endpoint.name, endpoint.method
            ));
        }
    }

    Ok(())
}
