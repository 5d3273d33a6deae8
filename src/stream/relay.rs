//! 流式中继
//!
//! 打开一个上游流式请求，把字节块送入解码器，逐个产出增量文本。
//!
//! - 返回的流由调用方拉取驱动，调用方不拉取时不会读取上游
//! - 流持有上游响应，流被丢弃即中断上游连接
//! - 上游在流中途断开时产出一个 `Interrupted`，随后结束

use super::decoder::SseDecoder;
use super::events::StreamEvent;
use crate::error::GenerationFailure;
use crate::logger::sanitize_log_message;
use crate::models::GenerationRequest;
use crate::providers::{ProviderAdapter, ProviderKind};
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// 中断标记前缀（HTTP 中继写入响应体的诊断文本）
pub const INTERRUPTION_MARKER: &str = "\n[ERROR: stream interrupted";

/// 生成完整的中断标记
pub fn interruption_marker(reason: &str) -> String {
    format!("{}: {}]", INTERRUPTION_MARKER, reason.replace(']', ")"))
}

/// 中继输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayChunk {
    /// 增量文本
    Delta(String),
    /// 上游在流中途断开，携带原因，之后流结束
    Interrupted(String),
}

/// 中继流
pub type RelayStream = Pin<Box<dyn Stream<Item = RelayChunk> + Send>>;

/// 中继统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    pub deltas: usize,
    pub bytes_received: usize,
    pub malformed_frames: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelayOutcome {
    /// 收到结束标记
    Terminated,
    /// 上游正常关闭但没有结束标记
    Closed,
    /// 上游中途断开
    Interrupted,
}

/// 请求生命周期守卫
///
/// 随流一起被丢弃；未记录结果即被丢弃说明调用方已断开。
struct RelayGuard {
    request_id: String,
    model: String,
    started: Instant,
    stats: RelayStats,
    outcome: Option<RelayOutcome>,
}

impl RelayGuard {
    fn new(request_id: String, model: String) -> Self {
        Self {
            request_id,
            model,
            started: Instant::now(),
            stats: RelayStats::default(),
            outcome: None,
        }
    }

    fn complete(&mut self, outcome: RelayOutcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        match self.outcome {
            Some(outcome) => tracing::info!(
                request_id = %self.request_id,
                model = %self.model,
                deltas = self.stats.deltas,
                bytes = self.stats.bytes_received,
                malformed = self.stats.malformed_frames,
                elapsed_ms,
                "[RELAY] 流结束: {:?}",
                outcome
            ),
            None => tracing::info!(
                request_id = %self.request_id,
                model = %self.model,
                deltas = self.stats.deltas,
                elapsed_ms,
                "[RELAY] 调用方已断开, 上游请求已取消"
            ),
        }
    }
}

/// 流式中继
#[derive(Debug, Clone)]
pub struct StreamRelay {
    client: Client,
    provider: ProviderKind,
    adapter: Arc<dyn ProviderAdapter>,
    endpoint: String,
    credential: Arc<str>,
}

impl StreamRelay {
    /// 使用 Provider 的默认端点创建中继
    pub fn new(client: Client, provider: ProviderKind, credential: Arc<str>) -> Self {
        let endpoint = provider.default_endpoint().to_string();
        Self {
            client,
            provider,
            adapter: provider.adapter(),
            endpoint,
            credential,
        }
    }

    /// 覆盖上游端点
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// 打开上游流
    ///
    /// 上游返回非 2xx 时直接返回 `UpstreamRejected`，不会产生任何流。
    pub async fn open(
        &self,
        request: &GenerationRequest,
        model: &str,
    ) -> Result<RelayStream, GenerationFailure> {
        request.validate()?;

        let request_id = uuid::Uuid::new_v4().to_string();
        tracing::info!(
            "[RELAY] 发起上游请求: request_id={}, provider={}, model={}, messages={}",
            request_id,
            self.provider.name(),
            model,
            request.messages.len()
        );

        let response = self
            .adapter
            .build_upstream_request(&self.client, &self.endpoint, &self.credential, request, model)
            .send()
            .await
            .map_err(|e| {
                let failure = GenerationFailure::Transport(e.to_string());
                failure.log_with_context(&request_id, model);
                failure
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let failure = GenerationFailure::UpstreamRejected {
                status: status.as_u16(),
                body: sanitize_log_message(&body),
            };
            failure.log_with_context(&request_id, model);
            return Err(failure);
        }

        let mut decoder = SseDecoder::new(self.adapter.clone());
        let mut upstream = response.bytes_stream();
        let mut guard = RelayGuard::new(request_id, model.to_string());

        let stream = async_stream::stream! {
            while let Some(item) = upstream.next().await {
                match item {
                    Ok(chunk) => {
                        guard.stats.bytes_received += chunk.len();
                        for event in decoder.decode(&chunk) {
                            match event {
                                StreamEvent::Delta(text) => {
                                    guard.stats.deltas += 1;
                                    yield RelayChunk::Delta(text);
                                }
                                StreamEvent::Malformed { payload, reason } => {
                                    guard.stats.malformed_frames += 1;
                                    tracing::warn!(
                                        "[RELAY] 跳过无法解析的帧: request_id={}, reason={}, payload={}",
                                        guard.request_id,
                                        reason,
                                        sanitize_log_message(&payload)
                                    );
                                }
                                StreamEvent::Terminator => {}
                            }
                        }
                        if decoder.is_terminated() {
                            guard.complete(RelayOutcome::Terminated);
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            "[RELAY] 上游流中断: request_id={}, error={}",
                            guard.request_id,
                            e
                        );
                        guard.complete(RelayOutcome::Interrupted);
                        yield RelayChunk::Interrupted(e.to_string());
                        return;
                    }
                }
            }

            for event in decoder.finish() {
                if let StreamEvent::Malformed { payload, reason } = event {
                    guard.stats.malformed_frames += 1;
                    tracing::warn!(
                        "[RELAY] 丢弃残留片段: request_id={}, reason={}, payload={}",
                        guard.request_id,
                        reason,
                        sanitize_log_message(&payload)
                    );
                }
            }
            tracing::debug!("[RELAY] 上游关闭连接但未发送结束标记: request_id={}", guard.request_id);
            guard.complete(RelayOutcome::Closed);
        };

        Ok(Box::pin(stream))
    }
}
