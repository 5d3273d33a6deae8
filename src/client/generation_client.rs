//! 生成客户端
//!
//! 调用方的唯一入口：
//! - 流式：[`GenerationClient::generate_stream`] 返回 `GenerationUpdate` 流，每个增量附带累计文本
//! - 阻塞：[`GenerationClient::generate`] 等待完整文本
//! - 结构化：[`GenerationClient::run`] / [`GenerationClient::generate_json`] 在流结束后提取 JSON
//!
//! 降级策略：按计划顺序尝试，首个增量到达前的可重试失败切换到下一项；
//! 首个增量到达后即锁定当前模型，不再超时或切换。

use super::transport::GenerationTransport;
use crate::error::GenerationFailure;
use crate::extractor::{extract, ExtractedJson, ExtractionError};
use crate::models::{GenerationMode, GenerationRequest};
use crate::resilience::{DowngradeLog, FailureClass, RetryPlan, SwitchEvent, TimeoutController};
use crate::stream::{Accumulator, RelayChunk};
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// 完成状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Completion {
    Complete,
    /// 已输出部分内容后上游中断
    Interrupted { reason: String },
}

/// 一次生成的结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationOutput {
    pub text: String,
    /// 实际产出内容的模型
    pub model: String,
    /// 尝试次数（含成功的一次）
    pub attempts: u32,
    pub completion: Completion,
    pub downgrades: Vec<SwitchEvent>,
}

impl GenerationOutput {
    pub fn is_complete(&self) -> bool {
        matches!(self.completion, Completion::Complete)
    }
}

/// 流式更新
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationUpdate {
    /// 开始尝试计划中的第 `index` 项
    Attempt { model: String, index: usize },
    /// 首字节前失败，切换模型
    Downgraded(SwitchEvent),
    /// 新增量及累计文本
    Progress { delta: String, text: String },
    /// 最终结果，总是最后一个
    Finished(Result<GenerationOutput, GenerationFailure>),
}

/// 流式更新流
pub type GenerationStream = Pin<Box<dyn Stream<Item = GenerationUpdate> + Send>>;

/// 客户端错误
///
/// 区分"模型没有回答"和"模型回答了但格式不对"。
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error(transparent)]
    Generation(#[from] GenerationFailure),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// 按模式分派的结果
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    Text(GenerationOutput),
    Structured {
        output: GenerationOutput,
        json: ExtractedJson,
    },
}

/// 结构化结果
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredOutput<T> {
    pub value: T,
    pub output: GenerationOutput,
}

/// 生成客户端
///
/// 传输层由调用方注入；需要"重置"时直接构造新实例。
#[derive(Clone)]
pub struct GenerationClient {
    transport: Arc<dyn GenerationTransport>,
    plan: RetryPlan,
}

impl std::fmt::Debug for GenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClient")
            .field("transport", &self.transport.name())
            .field("plan", &self.plan)
            .finish()
    }
}

impl GenerationClient {
    pub fn new(transport: Arc<dyn GenerationTransport>, plan: RetryPlan) -> Self {
        Self { transport, plan }
    }

    pub fn plan(&self) -> &RetryPlan {
        &self.plan
    }

    /// 流式生成
    pub fn generate_stream(&self, request: GenerationRequest) -> GenerationStream {
        let transport = self.transport.clone();
        let plan = match request.model.as_deref() {
            Some(model) => self.plan.prefer(model),
            None => self.plan.clone(),
        };

        Box::pin(async_stream::stream! {
            if let Err(failure) = request.validate() {
                yield GenerationUpdate::Finished(Err(failure));
                return;
            }

            let entries = plan.entries().to_vec();
            let mut downgrades = DowngradeLog::new();

            for (index, entry) in entries.iter().enumerate() {
                tracing::info!(
                    "[CLIENT] 尝试模型 {} ({}/{}), 首字节超时 {}ms, 传输 {}",
                    entry.model,
                    index + 1,
                    entries.len(),
                    entry.first_byte_timeout_ms,
                    transport.name()
                );
                yield GenerationUpdate::Attempt {
                    model: entry.model.clone(),
                    index,
                };

                let controller = TimeoutController::new(entry.first_byte_timeout());
                let attempt = controller
                    .execute_with_timeout(async {
                        let mut stream = transport.open(&request, &entry.model).await?;
                        let first = stream.next().await;
                        Ok::<_, GenerationFailure>((stream, first))
                    })
                    .await;

                let failure = match attempt {
                    Err(timeout) => GenerationFailure::Timeout {
                        model: entry.model.clone(),
                        timeout_ms: timeout.timeout_ms,
                    },
                    Ok(Err(failure)) => failure,
                    Ok(Ok((_, Some(RelayChunk::Interrupted(reason))))) => {
                        GenerationFailure::Transport(format!("首个增量前连接中断: {}", reason))
                    }
                    Ok(Ok((mut stream, first))) => {
                        tracing::info!("[CLIENT] 模型 {} 已开始输出", entry.model);

                        let mut accumulator = Accumulator::new();
                        let mut completion = Completion::Complete;
                        let mut next = first;
                        while let Some(chunk) = next {
                            match chunk {
                                RelayChunk::Delta(delta) => {
                                    let text = accumulator.push(&delta).to_string();
                                    yield GenerationUpdate::Progress { delta, text };
                                }
                                RelayChunk::Interrupted(reason) => {
                                    tracing::warn!(
                                        "[CLIENT] 模型 {} 输出中断, 已收到 {} 个增量: {}",
                                        entry.model,
                                        accumulator.delta_count(),
                                        reason
                                    );
                                    completion = Completion::Interrupted { reason };
                                    break;
                                }
                            }
                            next = stream.next().await;
                        }

                        yield GenerationUpdate::Finished(Ok(GenerationOutput {
                            text: accumulator.into_text(),
                            model: entry.model.clone(),
                            attempts: index as u32 + 1,
                            completion,
                            downgrades: downgrades.into_events(),
                        }));
                        return;
                    }
                };

                if !FailureClass::classify(&failure, &plan).is_retryable() {
                    tracing::error!("[CLIENT] 模型 {} 失败且不可重试: {}", entry.model, failure);
                    yield GenerationUpdate::Finished(Err(failure));
                    return;
                }

                match entries.get(index + 1) {
                    Some(next_entry) => {
                        let event = downgrades.record(&entry.model, &next_entry.model, &failure);
                        tokio::time::sleep(plan.switch_delay(index as u32)).await;
                        yield GenerationUpdate::Downgraded(event);
                    }
                    None => {
                        tracing::error!("[CLIENT] 降级计划耗尽: {}", failure);
                        yield GenerationUpdate::Finished(Err(GenerationFailure::PlanExhausted {
                            attempts: entries.len() as u32,
                            last: Box::new(failure),
                        }));
                        return;
                    }
                }
            }

            yield GenerationUpdate::Finished(Err(GenerationFailure::Configuration(
                "降级计划为空".to_string(),
            )));
        })
    }

    /// 等待完整结果
    pub async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationOutput, GenerationFailure> {
        let mut updates = self.generate_stream(request);
        while let Some(update) = updates.next().await {
            if let GenerationUpdate::Finished(result) = update {
                return result;
            }
        }
        Err(GenerationFailure::Cancelled)
    }

    /// 按请求声明的模式执行
    pub async fn run(&self, request: GenerationRequest) -> Result<GenerationResult, ClientError> {
        let mode = request.mode;
        let output = self.generate(request).await?;
        match mode {
            GenerationMode::FreeText => Ok(GenerationResult::Text(output)),
            GenerationMode::Structured => {
                let json = extract_logged(&output)?;
                Ok(GenerationResult::Structured { output, json })
            }
        }
    }

    /// 生成并反序列化为具体类型
    ///
    /// 输出被中断时仍尝试从已收到的部分中提取。
    pub async fn generate_json<T: DeserializeOwned>(
        &self,
        request: GenerationRequest,
    ) -> Result<StructuredOutput<T>, ClientError> {
        let output = self.generate(request).await?;
        let value = extract_logged(&output)?.into_typed().map_err(|e| {
            tracing::warn!("[CLIENT] 结构化结果与目标类型不符: {}", e);
            e
        })?;
        Ok(StructuredOutput { value, output })
    }
}

fn extract_logged(output: &GenerationOutput) -> Result<ExtractedJson, ExtractionError> {
    extract(&output.text).map_err(|e| {
        tracing::warn!(
            "[CLIENT] 从模型 {} 的输出中提取 JSON 失败 (完成状态 {:?}): {}",
            output.model,
            output.completion,
            e
        );
        e
    })
}
