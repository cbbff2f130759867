//! 配置加载器实现
//!
//! 提供TOML/YAML配置文件解析、环境变量替换和错误处理功能

use crate::config::types::{validate_config, Config, EndpointSpec};
use crate::error::{ConfigError, Result};
use crate::health::domain::resolve_domain;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 配置文件目录名和默认文件名
const CONFIG_DIR_NAME: &str = "domain-vitals";
const LOCAL_CONFIG_FILE: &str = "domain-vitals.toml";
const LOCAL_ENDPOINTS_FILE: &str = "endpoints.yaml";

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `[global]` 加 `[[endpoints]]` 的TOML文件
    Toml,
    /// YAML文件：顶层端点列表，或与TOML相同结构的映射
    Yaml,
}

impl ConfigFormat {
    /// 按扩展名判断格式，`.yaml`/`.yml` 为YAML，其余按TOML处理
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                ConfigFormat::Yaml
            }
            _ => ConfigFormat::Toml,
        }
    }
}

/// YAML文件的两种写法
#[derive(Deserialize)]
#[serde(untagged)]
enum YamlDocument {
    /// 只有端点列表，全局配置取默认值
    Endpoints(Vec<EndpointSpec>),
    /// 完整配置
    Full(Config),
}

impl From<YamlDocument> for Config {
    fn from(document: YamlDocument) -> Self {
        match document {
            YamlDocument::Endpoints(endpoints) => Config {
                global: Default::default(),
                endpoints,
            },
            YamlDocument::Full(config) => config,
        }
    }
}

/// 配置加载器
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
}

impl ConfigLoader {
    /// 创建新的配置加载器
    ///
    /// # 参数
    /// * `enable_env_substitution` - 是否启用环境变量替换
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
        }
    }

    /// 从文件加载并验证配置
    pub async fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<Config> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::ParseError(format!("读取文件失败: {}", e)))?;

        let config = self.load_from_str_as(&content, ConfigFormat::from_path(path))?;

        tracing::info!(
            "成功加载配置文件: {}，端点数量: {}",
            path.display(),
            config.endpoints.len()
        );
        Ok(config)
    }

    /// 从TOML字符串加载并验证配置
    pub fn load_from_str(&self, content: &str) -> Result<Config> {
        self.load_from_str_as(content, ConfigFormat::Toml)
    }

    /// 按指定格式从字符串加载并验证配置
    pub fn load_from_str_as(&self, content: &str, format: ConfigFormat) -> Result<Config> {
        let config = self.parse(content, format)?;
        self.validate(&config)?;
        warn_unresolvable_endpoints(&config);
        Ok(config)
    }

    /// 只读取配置中的日志级别，不做验证也不输出日志
    ///
    /// 日志系统安装之前使用，任何读取或解析失败都返回 `None`。
    pub fn peek_log_level<P: AsRef<Path>>(&self, path: P) -> Option<String> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).ok()?;
        self.parse(&content, ConfigFormat::from_path(path))
            .ok()
            .map(|config| config.global.log_level)
    }

    /// 验证配置
    pub fn validate(&self, config: &Config) -> Result<()> {
        validate_config(config).map_err(|e| ConfigError::ValidationError(e).into())
    }

    /// 替换字符串中的 `${VAR}` 环境变量
    fn substitute_env_vars(&self, content: &str) -> Result<String> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
            .map_err(|e| ConfigError::ParseError(format!("正则表达式错误: {}", e)))?;

        let mut result = content.to_string();

        for captures in env_var_regex.captures_iter(content) {
            let full_match = &captures[0];
            let var_name = &captures[1];

            match std::env::var(var_name) {
                Ok(value) => {
                    result = result.replace(full_match, &value);
                }
                Err(_) => {
                    return Err(ConfigError::EnvVarError {
                        var: var_name.to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(result)
    }

    fn parse(&self, content: &str, format: ConfigFormat) -> Result<Config> {
        let processed_content = self.substitute_env_vars(content)?;

        let config = match format {
            ConfigFormat::Toml => toml::from_str(&processed_content)
                .map_err(|e| ConfigError::ParseError(format!("TOML解析失败: {}", e)))?,
            ConfigFormat::Yaml => serde_yaml::from_str::<YamlDocument>(&processed_content)
                .map_err(|e| ConfigError::ParseError(format!("YAML解析失败: {}", e)))?
                .into(),
        };

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(true)
    }
}

/// 列出无法解析出域名的端点
pub fn unresolvable_endpoints(config: &Config) -> Vec<(String, String)> {
    config
        .endpoints
        .iter()
        .filter_map(|endpoint| {
            resolve_domain(&endpoint.url)
                .err()
                .map(|e| (endpoint.name.clone(), e.to_string()))
        })
        .collect()
}

fn warn_unresolvable_endpoints(config: &Config) {
    for (name, reason) in unresolvable_endpoints(config) {
        tracing::warn!("端点 {} 的目标地址无法解析出域名，将在每轮检测中报告: {}", name, reason);
    }
}

/// 获取默认配置文件路径
///
/// 当前目录下的 `domain-vitals.toml` 优先，其次是 `endpoints.yaml`，否则使用用户配置目录。
pub fn get_default_config_path() -> PathBuf {
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return local;
    }

    let endpoints = PathBuf::from(LOCAL_ENDPOINTS_FILE);
    if endpoints.exists() {
        return endpoints;
    }

    dirs::config_dir()
        .map(|config_dir| config_dir.join(CONFIG_DIR_NAME).join("config.toml"))
        .unwrap_or(local)
}

/// 示例配置文件内容
pub const SAMPLE_CONFIG: &str = r#"# domain-vitals 配置文件

[global]
check_interval_seconds = 15
request_timeout_seconds = 5
latency_threshold_ms = 500
max_concurrent_checks = 32
log_level = "info"

[[endpoints]]
name = "example index"
url = "https://example.com/"

[[endpoints]]
name = "example api"
url = "https://example.com/api/health"
method = "POST"
body = '{"ping": true}'

[endpoints.headers]
content-type = "application/json"
user-agent = "domain-vitals"
"#;
