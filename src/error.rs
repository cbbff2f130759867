//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;

/// Domain Vitals 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum DomainVitalsError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 域名解析错误
    #[error("域名解析错误: {0}")]
    Resolve(#[from] ResolveError),

    /// 可用性账本错误
    #[error("可用性账本错误: {0}")]
    Ledger(#[from] LedgerError),

    /// 健康检测相关错误
    #[error("健康检测错误: {0}")]
    HealthCheck(#[from] HealthCheckError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 目标地址无法解析出域名
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// URL 格式无效
    #[error("无效的URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// URL 中没有主机名部分
    #[error("URL缺少主机名: {url}")]
    MissingHost { url: String },
}

/// 账本一致性错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// 记录了一个启动时未注册的域名
    #[error("域名未注册: {domain}")]
    UnregisteredDomain { domain: String },
}

/// 健康检测错误类型
#[derive(Error, Debug)]
pub enum HealthCheckError {
    /// HTTP客户端构建失败
    #[error("HTTP客户端初始化失败: {0}")]
    ClientError(#[from] reqwest::Error),

    /// 无效的HTTP方法
    #[error("无效的HTTP方法: {method}")]
    InvalidMethod { method: String },

    /// 无效的请求头
    #[error("无效的请求头 {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, DomainVitalsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let err: DomainVitalsError = LedgerError::UnregisteredDomain {
            domain: "example.com".to_string(),
        }
        .into();
        assert!(matches!(err, DomainVitalsError::Ledger(_)));
        assert!(err.to_string().contains("example.com"));

        let err: DomainVitalsError = ConfigError::FileNotFound {
            path: "/tmp/missing.toml".to_string(),
        }
        .into();
        assert!(err.to_string().contains("/tmp/missing.toml"));
    }

    #[test]
    fn test_resolve_error_display() {
        let err = ResolveError::MissingHost {
            url: "mailto:ops@example.com".to_string(),
        };
        assert_eq!(err.to_string(), "URL缺少主机名: mailto:ops@example.com");
    }
}
