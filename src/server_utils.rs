//! 服务端通用工具
//!
//! 响应构造与字符串处理，供 `server::handlers` 使用。

use crate::error::GenerationFailure;
use crate::stream::{interruption_marker, RelayChunk, RelayStream};
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use futures::StreamExt;
use std::convert::Infallible;

/// 安全截断字符串到指定字符数，避免 UTF-8 边界问题
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// 错误响应：`{"error": "...", "type": "..."}`
pub fn error_response(failure: &GenerationFailure) -> Response {
    let status =
        StatusCode::from_u16(failure.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(failure.to_json())).into_response()
}

/// 纯文本流响应
///
/// 增量按到达顺序原样写出；中断时追加中断标记后结束。
pub fn text_stream_response(stream: RelayStream) -> Response {
    let body_stream = stream.map(|chunk| {
        let bytes = match chunk {
            RelayChunk::Delta(text) => Bytes::from(text),
            RelayChunk::Interrupted(reason) => Bytes::from(interruption_marker(&reason)),
        };
        Ok::<Bytes, Infallible>(bytes)
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(body_stream))
        .unwrap_or_else(|e| {
            error_response(&GenerationFailure::Configuration(format!(
                "构建流式响应失败: {}",
                e
            )))
        })
}

/// 健康检查端点响应
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
