//! 生成传输层
//!
//! 客户端通过 [`GenerationTransport`] 获取增量流：
//! - [`StreamRelay`] 直接在进程内连接上游
//! - [`HttpRelayTransport`] 调用 `/api/ai` 中继接口，把纯文本响应还原成增量流

use crate::error::GenerationFailure;
use crate::models::GenerationRequest;
use crate::stream::{RelayChunk, RelayStream, StreamRelay, INTERRUPTION_MARKER};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};

/// 生成传输
#[async_trait]
pub trait GenerationTransport: Send + Sync {
    /// 传输名称（用于日志）
    fn name(&self) -> &'static str;

    /// 为指定模型打开增量流
    async fn open(
        &self,
        request: &GenerationRequest,
        model: &str,
    ) -> Result<RelayStream, GenerationFailure>;
}

#[async_trait]
impl GenerationTransport for StreamRelay {
    fn name(&self) -> &'static str {
        "in_process"
    }

    async fn open(
        &self,
        request: &GenerationRequest,
        model: &str,
    ) -> Result<RelayStream, GenerationFailure> {
        StreamRelay::open(self, request, model).await
    }
}

/// 通过 HTTP 中继接口生成
#[derive(Debug, Clone)]
pub struct HttpRelayTransport {
    client: Client,
    endpoint: String,
}

impl HttpRelayTransport {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerationTransport for HttpRelayTransport {
    fn name(&self) -> &'static str {
        "http_relay"
    }

    async fn open(
        &self,
        request: &GenerationRequest,
        model: &str,
    ) -> Result<RelayStream, GenerationFailure> {
        request.validate()?;

        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "messages": request.messages,
                "model": model,
            }))
            .send()
            .await
            .map_err(|e| GenerationFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(relay_failure(status.as_u16(), text));
        }

        let mut body = response.bytes_stream();
        let stream = async_stream::stream! {
            let mut utf8 = Utf8Buffer::default();
            let mut scanner = MarkerScanner::default();

            while let Some(item) = body.next().await {
                match item {
                    Ok(bytes) => {
                        let text = utf8.push(&bytes);
                        if let Some(chunk) = scanner.push(&text) {
                            yield chunk;
                        }
                    }
                    Err(e) => {
                        let tail = utf8.finish();
                        if let Some(chunk) = scanner.push(&tail) {
                            yield chunk;
                        }
                        for chunk in scanner.finish(Some(e.to_string())) {
                            yield chunk;
                        }
                        return;
                    }
                }
            }

            let tail = utf8.finish();
            if let Some(chunk) = scanner.push(&tail) {
                yield chunk;
            }
            for chunk in scanner.finish(None) {
                yield chunk;
            }
        };

        Ok(Box::pin(stream))
    }
}

/// 还原中继接口返回的错误
///
/// 中继在上游连接失败或超时时同样返回非 2xx，需按 `type` 字段还原，
/// 否则客户端会把可重试的失败当成上游拒绝。
fn relay_failure(status: u16, text: String) -> GenerationFailure {
    let body = serde_json::from_str::<Value>(&text).ok();
    let field = |name: &str| {
        body.as_ref()
            .and_then(|v| v.get(name))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    };
    let message = field("error").unwrap_or(text);

    match field("type").as_deref() {
        // 中继不知道上游超时的具体时限，统一按传输错误处理
        Some("transport_error") | Some("timeout_error") => GenerationFailure::Transport(message),
        _ => GenerationFailure::UpstreamRejected {
            status,
            body: message,
        },
    }
}

/// 跨字节块的 UTF-8 解码
///
/// 字节块可能在多字节字符中间切断，不完整的尾部留到下一块。
#[derive(Debug, Default)]
struct Utf8Buffer {
    pending: Vec<u8>,
}

impl Utf8Buffer {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_string();
                self.pending.clear();
                text
            }
            Err(e) if e.error_len().is_none() => {
                let valid = e.valid_up_to();
                let text = String::from_utf8_lossy(&self.pending[..valid]).into_owned();
                self.pending.drain(..valid);
                text
            }
            Err(_) => {
                let text = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                text
            }
        }
    }

    fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

/// 中断标记识别
///
/// 标记可能被切在两个块之间：文本末尾若是标记的前缀，先扣住不发，
/// 等下一块到达后再判断。
#[derive(Debug, Default)]
struct MarkerScanner {
    pending: String,
    /// 已识别到标记时，标记之后的全部文本
    marker_tail: Option<String>,
}

impl MarkerScanner {
    fn push(&mut self, text: &str) -> Option<RelayChunk> {
        if let Some(tail) = &mut self.marker_tail {
            tail.push_str(text);
            return None;
        }

        self.pending.push_str(text);

        if let Some(pos) = self.pending.find(INTERRUPTION_MARKER) {
            let tail = self.pending.split_off(pos);
            self.marker_tail = Some(tail[INTERRUPTION_MARKER.len()..].to_string());
            let before = std::mem::take(&mut self.pending);
            return (!before.is_empty()).then_some(RelayChunk::Delta(before));
        }

        let emit_len = self.pending.len() - held_suffix_len(&self.pending);
        if emit_len == 0 {
            return None;
        }
        let held = self.pending.split_off(emit_len);
        let emit = std::mem::replace(&mut self.pending, held);
        Some(RelayChunk::Delta(emit))
    }

    fn finish(&mut self, transport_error: Option<String>) -> Vec<RelayChunk> {
        if let Some(tail) = self.marker_tail.take() {
            let reason = tail
                .trim_start_matches(':')
                .trim()
                .trim_end_matches(']')
                .trim()
                .to_string();
            let reason = if reason.is_empty() {
                transport_error.unwrap_or_else(|| "stream interrupted".to_string())
            } else {
                reason
            };
            return vec![RelayChunk::Interrupted(reason)];
        }

        let mut chunks = Vec::new();
        let pending = std::mem::take(&mut self.pending);
        if !pending.is_empty() {
            chunks.push(RelayChunk::Delta(pending));
        }
        if let Some(error) = transport_error {
            chunks.push(RelayChunk::Interrupted(error));
        }
        chunks
    }
}

/// 文本末尾与标记前缀重合的最大长度
fn held_suffix_len(text: &str) -> usize {
    (1..INTERRUPTION_MARKER.len())
        .rev()
        .find(|&k| text.ends_with(&INTERRUPTION_MARKER[..k]))
        .unwrap_or(0)
}
