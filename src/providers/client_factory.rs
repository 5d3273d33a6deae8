//! 上游 HTTP 客户端工厂
//!
//! 所有请求共享一个连接池化的 `reqwest::Client`。
//! 只设置连接超时，不设置整体请求超时：流式响应可能持续数分钟，
//! 首字节超时由降级计划按尝试单独控制。

use reqwest::{Client, Proxy};
use std::time::Duration;
use thiserror::Error;

/// 出站代理协议
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyScheme {
    Socks5,
    Http,
    Https,
}

impl ProxyScheme {
    /// 从代理 URL 解析协议，大小写不敏感
    pub fn from_url(url: &str) -> Option<Self> {
        let (scheme, _) = url.split_once("://")?;
        match scheme.to_ascii_lowercase().as_str() {
            "socks5" | "socks5h" => Some(ProxyScheme::Socks5),
            "http" => Some(ProxyScheme::Http),
            "https" => Some(ProxyScheme::Https),
            _ => None,
        }
    }
}

/// 客户端构建错误
#[derive(Debug, Error)]
pub enum ClientFactoryError {
    #[error("无效的代理 URL: {0}")]
    InvalidProxy(String),

    #[error("客户端构建错误: {0}")]
    Build(String),
}

/// 上游客户端工厂
#[derive(Debug, Clone)]
pub struct UpstreamClientFactory {
    proxy: Option<String>,
    connect_timeout: Duration,
    pool_idle_timeout: Duration,
}

impl Default for UpstreamClientFactory {
    fn default() -> Self {
        Self {
            proxy: None,
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl UpstreamClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置出站代理，空字符串视为不使用代理
    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    /// 创建 HTTP 客户端
    pub fn build(&self) -> Result<Client, ClientFactoryError> {
        let mut builder = Client::builder()
            .connect_timeout(self.connect_timeout)
            .pool_idle_timeout(self.pool_idle_timeout)
            .tcp_keepalive(Duration::from_secs(30));

        if let Some(url) = &self.proxy {
            if ProxyScheme::from_url(url).is_none() {
                return Err(ClientFactoryError::InvalidProxy(url.clone()));
            }
            let proxy = Proxy::all(url).map_err(|e| ClientFactoryError::InvalidProxy(e.to_string()))?;
            builder = builder.proxy(proxy);
            tracing::info!("[UPSTREAM] 使用出站代理: {}", url);
        }

        builder
            .build()
            .map_err(|e| ClientFactoryError::Build(e.to_string()))
    }
}
