//! Provider 适配器 Trait 定义
//!
//! 中继层只依赖两件事：如何构造上游请求，以及如何从一帧 JSON 中取出增量文本。
//! 新增 Provider 只需实现这两个方法，解码器和中继无需改动。

use crate::models::GenerationRequest;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::fmt;

/// 单帧解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFrame {
    /// 非空的增量文本
    pub delta: Option<String>,
    /// Provider 声明本次生成已结束（finish_reason）
    pub finished: bool,
}

impl ParsedFrame {
    pub fn delta(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            delta: if text.is_empty() { None } else { Some(text) },
            finished: false,
        }
    }

    /// 控制帧：无内容
    pub fn control() -> Self {
        Self::default()
    }

    pub fn with_finished(mut self, finished: bool) -> Self {
        self.finished = finished;
        self
    }
}

/// Provider 适配器
pub trait ProviderAdapter: Send + Sync + fmt::Debug {
    /// 构造开启流式输出的上游请求
    fn build_upstream_request(
        &self,
        client: &Client,
        endpoint: &str,
        credential: &str,
        request: &GenerationRequest,
        model: &str,
    ) -> RequestBuilder;

    /// 从一帧已解析的 JSON 中提取增量
    fn parse_frame(&self, frame: &Value) -> ParsedFrame;

    /// SSE 事件前缀
    fn event_prefix(&self) -> &'static str {
        "data:"
    }

    /// 流结束标记
    fn end_sentinel(&self) -> &'static str {
        "[DONE]"
    }
}

/// 判断 finish_reason 是否表示生成结束
///
/// DashScope 在未结束的帧里会返回字符串 "null"。
pub(crate) fn is_finish_reason(value: Option<&Value>) -> bool {
    matches!(
        value.and_then(|v| v.as_str()),
        Some("stop") | Some("length")
    )
}
