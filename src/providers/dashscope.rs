//! 阿里云 DashScope（通义千问）适配器
//!
//! 使用原生文本生成接口的 SSE 模式：
//! - 请求头 `X-DashScope-SSE: enable`
//! - `parameters.incremental_output = true`，每帧只携带新增文本
//! - 内容位于 `output.choices[0].message.content`

use super::traits::{is_finish_reason, ParsedFrame, ProviderAdapter};
use crate::models::GenerationRequest;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

/// DashScope 文本生成端点
pub const DASHSCOPE_ENDPOINT: &str =
    "https://dashscope.aliyuncs.com/api/v1/services/aigc/text-generation/generation";

/// 默认模型
pub const DASHSCOPE_DEFAULT_MODEL: &str = "qwen-plus";

#[derive(Debug, Clone, Default)]
pub struct DashScopeAdapter;

impl DashScopeAdapter {
    pub fn new() -> Self {
        Self
    }

    /// 构造请求体
    pub fn build_body(request: &GenerationRequest, model: &str) -> Value {
        json!({
            "model": model,
            "input": {
                "messages": request.messages,
            },
            "parameters": {
                "result_format": "message",
                "incremental_output": true,
            }
        })
    }
}

impl ProviderAdapter for DashScopeAdapter {
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
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .header("X-DashScope-SSE", "enable")
            .json(&Self::build_body(request, model))
    }

    fn parse_frame(&self, frame: &Value) -> ParsedFrame {
        let choice = match frame.pointer("/output/choices/0") {
            Some(choice) => choice,
            None => return ParsedFrame::control(),
        };

        let parsed = choice
            .pointer("/message/content")
            .and_then(|c| c.as_str())
            .map(ParsedFrame::delta)
            .unwrap_or_default();

        parsed.with_finished(is_finish_reason(choice.get("finish_reason")))
    }
}
