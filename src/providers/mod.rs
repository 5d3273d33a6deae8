//! Provider 适配层
//!
//! - `traits`: 适配器接口
//! - `dashscope`: 阿里云 DashScope 原生接口（默认）
//! - `openai_compat`: OpenAI 兼容接口
//! - `client_factory`: 共享的上游 HTTP 客户端

pub mod client_factory;
pub mod dashscope;
pub mod openai_compat;
pub mod traits;

pub use client_factory::{ClientFactoryError, UpstreamClientFactory};
pub use dashscope::{DashScopeAdapter, DASHSCOPE_DEFAULT_MODEL, DASHSCOPE_ENDPOINT};
pub use openai_compat::{OpenAiCompatAdapter, OPENAI_COMPAT_ENDPOINT};
pub use traits::{ParsedFrame, ProviderAdapter};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Provider 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Dashscope,
    OpenaiCompat,
}

impl ProviderKind {
    /// Provider 名称（用于日志）
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Dashscope => "dashscope",
            ProviderKind::OpenaiCompat => "openai_compat",
        }
    }

    /// 默认的流式生成端点
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::Dashscope => DASHSCOPE_ENDPOINT,
            ProviderKind::OpenaiCompat => OPENAI_COMPAT_ENDPOINT,
        }
    }

    /// 创建对应的适配器
    pub fn adapter(&self) -> Arc<dyn ProviderAdapter> {
        match self {
            ProviderKind::Dashscope => Arc::new(DashScopeAdapter::new()),
            ProviderKind::OpenaiCompat => Arc::new(OpenAiCompatAdapter::new()),
        }
    }
}
