//! OpenAI 兼容接口适配器
//!
//! 适用于 DashScope compatible-mode 以及其他 OpenAI 风格的 Chat Completions 服务。

use super::traits::{is_finish_reason, ParsedFrame, ProviderAdapter};
use crate::models::GenerationRequest;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

/// DashScope 的 OpenAI 兼容端点
pub const OPENAI_COMPAT_ENDPOINT: &str =
    "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions";

#[derive(Debug, Clone, Default)]
pub struct OpenAiCompatAdapter;

impl OpenAiCompatAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ProviderAdapter for OpenAiCompatAdapter {
    fn build_upstream_request(
        &self,
        client: &Client,
        endpoint: &str,
        credential: &str,
        request: &GenerationRequest,
        model: &str,
    ) -> RequestBuilder {
        client
            .post(endpoint)
            .bearer_auth(credential)
            .header("Accept", "text/event-stream")
            .json(&json!({
                "model": model,
                "messages": request.messages,
                "stream": true,
            }))
    }

    fn parse_frame(&self, frame: &Value) -> ParsedFrame {
        let choice = match frame.pointer("/choices/0") {
            Some(choice) => choice,
            None => return ParsedFrame::control(),
        };

        choice
            .pointer("/delta/content")
            .and_then(|c| c.as_str())
            .map(ParsedFrame::delta)
            .unwrap_or_default()
            .with_finished(is_finish_reason(choice.get("finish_reason")))
    }
}
