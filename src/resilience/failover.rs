//! 失败分类与模型降级记录
//!
//! 只有在首个增量到达之前发生的、可重试的失败才会触发降级。

use super::retry::RetryPlan;
use crate::error::GenerationFailure;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// 失败类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// 可切换到计划中的下一项
    Retryable,
    /// 立即返回给调用方
    Fatal,
}

impl FailureClass {
    /// 对首个增量之前的失败分类
    ///
    /// 超时、传输中断、连接被拒绝以及计划声明的状态码（默认 504）可重试；
    /// 其余非 2xx、配置错误和无效请求都是致命错误。
    pub fn classify(failure: &GenerationFailure, plan: &RetryPlan) -> Self {
        match failure {
            GenerationFailure::Timeout { .. } | GenerationFailure::Transport(_) => {
                FailureClass::Retryable
            }
            GenerationFailure::UpstreamRejected { status, .. } if plan.is_retryable_status(*status) => {
                FailureClass::Retryable
            }
            _ => FailureClass::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureClass::Retryable)
    }
}

/// 模型切换事件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwitchEvent {
    pub from_model: String,
    pub to_model: String,
    /// 触发切换的失败描述
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// 单次生成请求内的降级日志
#[derive(Debug, Clone, Default)]
pub struct DowngradeLog {
    events: Vec<SwitchEvent>,
}

impl DowngradeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次切换
    pub fn record(&mut self, from: &str, to: &str, failure: &GenerationFailure) -> SwitchEvent {
        let event = SwitchEvent {
            from_model: from.to_string(),
            to_model: to.to_string(),
            reason: failure.to_string(),
            timestamp: Utc::now(),
        };
        tracing::warn!(
            "[DOWNGRADE] 模型 {} 首字节前失败, 切换到 {}: {}",
            from,
            to,
            crate::logger::sanitize_log_message(&event.reason)
        );
        self.events.push(event.clone());
        event
    }

    pub fn events(&self) -> &[SwitchEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<SwitchEvent> {
        self.events
    }
}
