//! HTTP探测执行器
//!
//! 对单个端点发出一次请求，测量延迟并判定健康状态

use crate::config::EndpointSpec;
use crate::error::{HealthCheckError, ResolveError};
use crate::health::domain::resolve_domain;
use crate::health::result::{HealthPolicy, ProbeOutcome};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// 默认单次请求超时时间
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// 探测执行器trait
#[async_trait]
pub trait ProbeExecutor: Send + Sync {
    /// 对端点执行一次探测
    ///
    /// # 参数
    /// * `endpoint` - 端点配置
    ///
    /// # 返回
    /// * `Ok(ProbeOutcome)` - 探测完成（无论健康与否）
    /// * `Err(ResolveError)` - 目标地址无法解析出域名，结果无法聚合
    async fn probe(&self, endpoint: &EndpointSpec) -> Result<ProbeOutcome, ResolveError>;
}

/// 基于 reqwest 的HTTP探测执行器
pub struct HttpProbeExecutor {
    /// HTTP客户端
    client: Client,
    /// 单次请求超时时间
    request_timeout: Duration,
    /// 健康判定策略
    policy: HealthPolicy,
}

impl HttpProbeExecutor {
    /// 创建新的HTTP探测执行器
    ///
    /// # 参数
    /// * `request_timeout` - 单次请求超时时间
    /// * `policy` - 健康判定策略
    pub fn new(request_timeout: Duration, policy: HealthPolicy) -> crate::error::Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()
            .map_err(HealthCheckError::ClientError)?;

        Ok(Self {
            client,
            request_timeout,
            policy,
        })
    }

    /// 构建HTTP请求
    fn build_request(
        &self,
        endpoint: &EndpointSpec,
    ) -> Result<reqwest::RequestBuilder, HealthCheckError> {
        let method_name = endpoint.effective_method();
        let method = Method::from_bytes(method_name.as_bytes()).map_err(|_| {
            HealthCheckError::InvalidMethod {
                method: endpoint.method.clone(),
            }
        })?;

        let mut headers = HeaderMap::with_capacity(endpoint.headers.len());
        for (key, value) in &endpoint.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                HealthCheckError::InvalidHeader {
                    name: key.clone(),
                    reason: e.to_string(),
                }
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| HealthCheckError::InvalidHeader {
                name: key.clone(),
                reason: e.to_string(),
            })?;
            headers.append(name, value);
        }

        let mut request = self.client.request(method, &endpoint.url).headers(headers);

        if !endpoint.body.is_empty() {
            request = request.body(endpoint.body.clone());
        }

        Ok(request)
    }

    /// 格式化请求错误信息
    fn format_request_error(error: &reqwest::Error) -> String {
        if error.is_timeout() {
            "Request timeout".to_string()
        } else if error.is_connect() {
            let error_str = format!("{:?}", error);
            if error_str.contains("dns") || error_str.contains("failed to lookup") {
                "DNS resolution failed".to_string()
            } else if error_str.contains("certificate")
                || error_str.contains("tls")
                || error_str.contains("Tls")
            {
                "SSL/TLS certificate error".to_string()
            } else {
                "Connection refused".to_string()
            }
        } else if error.is_builder() || error.is_request() {
            format!("Invalid request: {}", error)
        } else {
            format!("Request failed: {}", error)
        }
    }
}

#[async_trait]
impl ProbeExecutor for HttpProbeExecutor {
    async fn probe(&self, endpoint: &EndpointSpec) -> Result<ProbeOutcome, ResolveError> {
        let domain = resolve_domain(&endpoint.url)?;

        let request = match self.build_request(endpoint) {
            Ok(request) => request,
            Err(e) => {
                return Ok(ProbeOutcome::failed(
                    endpoint.name.clone(),
                    domain,
                    e.to_string(),
                ))
            }
        };

        let start_time = Instant::now();
        // reqwest 在收到响应头时返回，响应体不读取
        let response_result = timeout(self.request_timeout, request.send()).await;

        let outcome = match response_result {
            Ok(Ok(response)) => {
                let latency = start_time.elapsed();
                let status_code = response.status().as_u16();
                ProbeOutcome::new(
                    endpoint.name.clone(),
                    domain,
                    self.policy.classify(status_code, latency),
                )
                .with_status_code(status_code)
                .with_latency(latency)
            }
            Ok(Err(e)) => ProbeOutcome::failed(
                endpoint.name.clone(),
                domain,
                Self::format_request_error(&e),
            ),
            Err(_) => ProbeOutcome::failed(
                endpoint.name.clone(),
                domain,
                "Request timeout".to_string(),
            ),
        };

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::result::HealthStatus;
    use tokio::net::TcpListener;

    fn executor(request_timeout: Duration) -> HttpProbeExecutor {
        HttpProbeExecutor::new(request_timeout, HealthPolicy::default()).unwrap()
    }

    #[tokio::test]
    async fn test_executor_creation() {
        let result = HttpProbeExecutor::new(DEFAULT_REQUEST_TIMEOUT, HealthPolicy::default());
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_fast_2xx_is_healthy() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .with_status(204)
            .create_async()
            .await;

        let endpoint = EndpointSpec::new("local", format!("{}/health", server.url()));
        let outcome = executor(DEFAULT_REQUEST_TIMEOUT)
            .probe(&endpoint)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(outcome.status, HealthStatus::Up);
        assert_eq!(outcome.status_code, Some(204));
        assert_eq!(outcome.domain, "127.0.0.1");
        assert_eq!(outcome.endpoint_name, "local");
        assert!(outcome.latency.is_some());
        assert!(outcome.failure_reason.is_none());
    }

    #[tokio::test]
    async fn test_404_is_unhealthy_with_latency() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let endpoint = EndpointSpec::new("missing", format!("{}/missing", server.url()));
        let outcome = executor(DEFAULT_REQUEST_TIMEOUT)
            .probe(&endpoint)
            .await
            .unwrap();

        assert_eq!(outcome.status, HealthStatus::Down);
        assert_eq!(outcome.status_code, Some(404));
        assert!(outcome.latency.is_some());
        assert!(outcome.failure_reason.is_none());
    }

    #[tokio::test]
    async fn test_method_headers_and_body_are_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/submit")
            .match_header("x-probe", "domain-vitals")
            .match_body("{\"ping\":true}")
            .with_status(200)
            .create_async()
            .await;

        let endpoint = EndpointSpec::new("submit", format!("{}/submit", server.url()))
            .with_method("post")
            .with_header("x-probe", "domain-vitals")
            .with_body("{\"ping\":true}");
        let outcome = executor(DEFAULT_REQUEST_TIMEOUT)
            .probe(&endpoint)
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(outcome.is_healthy());
    }

    #[tokio::test]
    async fn test_timeout_is_unhealthy_without_latency() {
        // 接受连接但从不响应
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let endpoint = EndpointSpec::new("stalled", format!("http://{}/", addr));
        let outcome = executor(Duration::from_millis(200))
            .probe(&endpoint)
            .await
            .unwrap();

        assert_eq!(outcome.status, HealthStatus::Down);
        assert!(outcome.latency.is_none());
        assert!(outcome.status_code.is_none());
        assert_eq!(outcome.failure_reason.as_deref(), Some("Request timeout"));
    }

    #[tokio::test]
    async fn test_slow_2xx_is_unhealthy() {
        // 读完请求后延迟300ms才返回200
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            use tokio::io::{AsyncReadExt, AsyncWriteExt};

            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                tokio::time::sleep(Duration::from_millis(300)).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
                    .await;
                let _ = socket.shutdown().await;
            }
        });

        let policy = HealthPolicy::new(Duration::from_millis(100));
        let endpoint = EndpointSpec::new("sluggish", format!("http://{}/", addr));
        let outcome = HttpProbeExecutor::new(Duration::from_secs(2), policy)
            .unwrap()
            .probe(&endpoint)
            .await
            .unwrap();

        assert_eq!(outcome.status, HealthStatus::Down);
        assert_eq!(outcome.status_code, Some(200));
        assert!(outcome.latency.unwrap() >= Duration::from_millis(100));
        assert!(outcome.failure_reason.is_none());
    }

    #[tokio::test]
    async fn test_connection_refused_is_unhealthy() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = EndpointSpec::new("closed", format!("http://{}/", addr));
        let outcome = executor(Duration::from_secs(2))
            .probe(&endpoint)
            .await
            .unwrap();

        assert_eq!(outcome.status, HealthStatus::Down);
        assert!(outcome.latency.is_none());
        assert!(outcome.failure_reason.is_some());
        assert_eq!(outcome.domain, "127.0.0.1");
    }

    #[tokio::test]
    async fn test_invalid_method_is_unhealthy() {
        let endpoint = EndpointSpec::new("bad", "http://127.0.0.1:9/").with_method("BAD METHOD");
        let outcome = executor(DEFAULT_REQUEST_TIMEOUT)
            .probe(&endpoint)
            .await
            .unwrap();

        assert_eq!(outcome.status, HealthStatus::Down);
        assert!(outcome.latency.is_none());
        assert!(outcome.failure_reason.unwrap().contains("HTTP方法"));
    }

    #[tokio::test]
    async fn test_invalid_header_is_unhealthy() {
        let endpoint =
            EndpointSpec::new("bad", "http://127.0.0.1:9/").with_header("bad header", "x");
        let outcome = executor(DEFAULT_REQUEST_TIMEOUT)
            .probe(&endpoint)
            .await
            .unwrap();

        assert_eq!(outcome.status, HealthStatus::Down);
        assert!(outcome.failure_reason.unwrap().contains("bad header"));
    }

    #[tokio::test]
    async fn test_unresolvable_target_is_resolve_error() {
        let endpoint = EndpointSpec::new("broken", "::not a url");
        let result = executor(DEFAULT_REQUEST_TIMEOUT).probe(&endpoint).await;

        assert!(matches!(result, Err(ResolveError::InvalidUrl { .. })));
    }
}
