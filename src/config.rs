//! 配置管理
//!
//! 加载顺序（低到高）：
//! 1. 代码内默认值
//! 2. YAML 配置文件（默认 `~/.config/classcast/config.yaml`）
//! 3. 环境变量
//!
//! API Key 只从配置文件或环境变量读取，启动时读取一次，之后只读共享。

use crate::providers::{ProviderKind, DASHSCOPE_DEFAULT_MODEL};
use crate::resilience::{PlanEntry, PlanError, RetryPlan, RETRYABLE_STATUS_CODES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// 配置文件路径环境变量
pub const CONFIG_PATH_ENV: &str = "CLASSCAST_CONFIG";
/// API Key 环境变量，按顺序查找
pub const API_KEY_ENVS: &[&str] = &["CLASSCAST_API_KEY", "ALIYUN_API_KEY"];

const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件失败 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("解析配置文件失败: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("未配置 API Key（请设置 CLASSCAST_API_KEY 或 ALIYUN_API_KEY）")]
    MissingCredential,

    #[error("降级计划无效: {0}")]
    InvalidPlan(#[from] PlanError),

    #[error("无效的配置项 {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// 服务配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 请求体大小上限（字节）
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

/// 上游配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub provider: ProviderKind,
    /// 覆盖 Provider 默认端点
    pub endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// HTTP 中继未指定模型时使用
    pub default_model: String,
    pub connect_timeout_secs: u64,
    /// 出站代理（socks5/http/https）
    pub proxy: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            endpoint: None,
            api_key: None,
            default_model: DASHSCOPE_DEFAULT_MODEL.to_string(),
            connect_timeout_secs: 10,
            proxy: None,
        }
    }
}

impl UpstreamConfig {
    /// 获取 API Key，未配置或为空时报错
    pub fn credential(&self) -> Result<Arc<str>, ConfigError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(Arc::<str>::from)
            .ok_or(ConfigError::MissingCredential)
    }
}

/// 容错配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub plan: Vec<PlanEntry>,
    pub retryable_status_codes: Vec<u16>,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            plan: vec![
                PlanEntry::new("qwen-plus", 10_000),
                PlanEntry::new("qwen-turbo", 20_000),
            ],
            retryable_status_codes: RETRYABLE_STATUS_CODES.to_vec(),
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

impl ResilienceConfig {
    pub fn to_retry_plan(&self) -> Result<RetryPlan, ConfigError> {
        Ok(RetryPlan::new(self.plan.clone())?
            .with_retryable_codes(self.retryable_status_codes.clone())
            .with_backoff(self.base_delay_ms, self.max_delay_ms))
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub resilience: ResilienceConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 加载配置
    ///
    /// `path` 为空时依次使用 `CLASSCAST_CONFIG` 和默认路径；文件不存在时使用默认值。
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from))
            .or_else(default_config_path);

        let mut config = match path {
            Some(ref p) if p.exists() => {
                tracing::info!("[CONFIG] 加载配置文件: {}", p.display());
                Self::from_file(p)?
            }
            _ => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载（不应用环境变量）
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// 应用环境变量覆盖
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = API_KEY_ENVS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|v| !v.trim().is_empty())
        {
            self.upstream.api_key = Some(key);
        }

        if let Some(host) = lookup("CLASSCAST_HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("CLASSCAST_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                key: "CLASSCAST_PORT".to_string(),
                value: port.clone(),
            })?;
        }

        if let Some(endpoint) = lookup("CLASSCAST_ENDPOINT") {
            self.upstream.endpoint = Some(endpoint);
        }

        if let Some(proxy) = lookup("CLASSCAST_PROXY") {
            self.upstream.proxy = Some(proxy);
        }

        if let Some(level) = lookup("CLASSCAST_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                value: self.logging.level.clone(),
            });
        }
        if self.upstream.default_model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "upstream.default_model".to_string(),
                value: String::new(),
            });
        }
        if self.server.body_limit_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "server.body_limit_bytes".to_string(),
                value: "0".to_string(),
            });
        }
        self.resilience.to_retry_plan()?;
        Ok(())
    }

    /// 监听地址
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// 默认配置文件路径
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("classcast").join("config.yaml"))
}
