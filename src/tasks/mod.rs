//! 教学功能任务
//!
//! 每个功能一个模块，提供：
//! - `build`: 纯函数，组装 [`GenerationRequest`]（最后一条消息为 user，模式已声明）
//! - `fallback`: 生成失败时的兜底值（如果该功能有）
//! - `generate`: 通过 [`GenerationClient`] 执行并后处理
//!
//! 结构化功能统一走 [`run_structured`]，兜底值用 [`FeatureOutcome::Fallback`] 标出，
//! 调用方不会把默认值误当成模型输出。

pub mod analysis;
pub mod grading;
pub mod lesson_plan;
pub mod quiz;
pub mod slides;

use crate::client::{Completion, GenerationClient};
use crate::models::GenerationRequest;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// 功能执行结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FeatureOutcome<T> {
    /// 模型生成
    Generated { value: T, completion: Completion },
    /// 兜底值
    Fallback { value: T, reason: String },
}

impl<T> FeatureOutcome<T> {
    pub fn value(&self) -> &T {
        match self {
            FeatureOutcome::Generated { value, .. } | FeatureOutcome::Fallback { value, .. } => {
                value
            }
        }
    }

    pub fn into_value(self) -> T {
        match self {
            FeatureOutcome::Generated { value, .. } | FeatureOutcome::Fallback { value, .. } => {
                value
            }
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, FeatureOutcome::Fallback { .. })
    }

    /// 对结果做后处理，来源标记不变
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FeatureOutcome<U> {
        match self {
            FeatureOutcome::Generated { value, completion } => FeatureOutcome::Generated {
                value: f(value),
                completion,
            },
            FeatureOutcome::Fallback { value, reason } => FeatureOutcome::Fallback {
                value: f(value),
                reason,
            },
        }
    }
}

/// 执行结构化请求，失败时返回兜底值
pub async fn run_structured<T, F>(
    client: &GenerationClient,
    request: GenerationRequest,
    fallback: F,
) -> FeatureOutcome<T>
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match client.generate_json::<T>(request).await {
        Ok(structured) => FeatureOutcome::Generated {
            value: structured.value,
            completion: structured.output.completion,
        },
        Err(e) => {
            tracing::warn!("[TASK] 结构化生成失败，使用兜底值: {}", e);
            FeatureOutcome::Fallback {
                value: fallback(),
                reason: e.to_string(),
            }
        }
    }
}
