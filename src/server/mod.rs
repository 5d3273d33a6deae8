//! HTTP 服务
//!
//! 对外只暴露一个中继接口 `POST /api/ai`，把上游的 SSE 流转成纯文本增量流。
//! 凭证在启动时读取一次，所有请求只读共享。

pub mod handlers;

use crate::config::AppConfig;
use crate::providers::{ClientFactoryError, UpstreamClientFactory};
use crate::server_utils::health;
use crate::stream::StreamRelay;
use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;

/// 应用状态
#[derive(Debug, Clone)]
pub struct AppState {
    /// 未配置凭证时为空，接口返回 500
    pub relay: Option<Arc<StreamRelay>>,
    /// 请求未指定模型时使用
    pub default_model: Arc<str>,
}

impl AppState {
    pub fn new(relay: Option<StreamRelay>, default_model: impl Into<Arc<str>>) -> Self {
        Self {
            relay: relay.map(Arc::new),
            default_model: default_model.into(),
        }
    }

    /// 从配置构建
    ///
    /// 缺少凭证不阻止启动，只记录警告。
    pub fn from_config(config: &AppConfig) -> Result<Self, ClientFactoryError> {
        let relay = match config.upstream.credential() {
            Ok(credential) => {
                let client = UpstreamClientFactory::new()
                    .with_proxy(config.upstream.proxy.clone())
                    .with_connect_timeout(Duration::from_secs(config.upstream.connect_timeout_secs))
                    .build()?;
                let mut relay =
                    StreamRelay::new(client, config.upstream.provider, credential);
                if let Some(endpoint) = &config.upstream.endpoint {
                    relay = relay.with_endpoint(endpoint.clone());
                }
                tracing::info!(
                    "[SERVER] 上游: provider={}, endpoint={}, 默认模型={}",
                    relay.provider_name(),
                    relay.endpoint(),
                    config.upstream.default_model
                );
                Some(relay)
            }
            Err(e) => {
                tracing::warn!("[SERVER] {}，/api/ai 将返回 500", e);
                None
            }
        };

        Ok(Self::new(relay, config.upstream.default_model.as_str()))
    }
}

/// 构建路由
pub fn build_router(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .route(
            "/api/ai",
            post(handlers::generate).fallback(handlers::method_not_allowed),
        )
        .route("/health", get(health))
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .with_state(state)
}

/// 启动服务，直到收到 Ctrl-C
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config).context("创建上游客户端失败")?;
    let app = build_router(state, config.server.body_limit_bytes);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("绑定地址失败: {}", addr))?;
    tracing::info!("[SERVER] 监听 http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("服务异常退出")?;

    tracing::info!("[SERVER] 已停止");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("[SERVER] 监听退出信号失败: {}", e);
        std::future::pending::<()>().await;
    }
}
