//! `/api/ai` 中继处理器
//!
//! 处理顺序：凭证检查 → 请求体解析 → 打开上游流 → 纯文本流响应。
//! 流开始之后的上游中断不改变状态码，只在正文末尾追加中断标记。

use crate::error::GenerationFailure;
use crate::models::{ChatMessage, GenerationRequest, Role};
use crate::server::AppState;
use crate::server_utils::{error_response, safe_truncate, text_stream_response};
use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;

/// 请求体
#[derive(Debug, Clone, Deserialize)]
pub struct RelayPayload {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub model: Option<String>,
}

/// POST /api/ai
pub async fn generate(State(state): State<AppState>, body: Bytes) -> Response {
    let Some(relay) = state.relay.as_ref() else {
        tracing::error!("[SERVER] 未配置 API Key，拒绝请求");
        return error_response(&GenerationFailure::Configuration(
            "服务端未配置 API Key".to_string(),
        ));
    };

    let payload: RelayPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("[SERVER] 请求体解析失败: {}", e);
            return error_response(&GenerationFailure::InvalidRequest(format!(
                "请求体解析失败: {}",
                e
            )));
        }
    };

    let model = payload
        .model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| state.default_model.to_string());
    let request = GenerationRequest::free_text(payload.messages);

    if let Some(last_user) = request.messages.iter().rev().find(|m| m.role == Role::User) {
        tracing::debug!(
            "[SERVER] /api/ai model={}, messages={}, 最后一条用户消息: {}",
            model,
            request.messages.len(),
            safe_truncate(&last_user.content, 50)
        );
    }

    match relay.open(&request, &model).await {
        Ok(stream) => text_stream_response(stream),
        Err(failure) => {
            tracing::warn!(
                "[SERVER] 上游流未建立: model={}, status={}, {}",
                model,
                failure.status_code(),
                crate::logger::sanitize_log_message(&failure.to_string())
            );
            error_response(&failure)
        }
    }
}

/// 非 POST 请求
pub async fn method_not_allowed(method: Method) -> Response {
    tracing::warn!("[SERVER] /api/ai 不支持的方法: {}", method);
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(serde_json::json!({ "error": "Method Not Allowed" })),
    )
        .into_response()
}
