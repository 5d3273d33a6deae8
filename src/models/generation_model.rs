//! 生成请求模型
//!
//! 一次生成请求由对话消息、可选的首选模型和调用模式组成，
//! 每次 UI 操作创建一个，消费一次。

use crate::error::GenerationFailure;
use serde::{Deserialize, Serialize};

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// 对话消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// 调用模式
///
/// - `FreeText`: 逐字展示的自由文本
/// - `Structured`: 流结束后从文本中提取 JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    #[default]
    FreeText,
    Structured,
}

/// 生成请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    /// 首选模型，为空时使用降级计划的第一项
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub mode: GenerationMode,
}

impl GenerationRequest {
    pub fn new(messages: Vec<ChatMessage>, mode: GenerationMode) -> Self {
        Self {
            messages,
            model: None,
            mode,
        }
    }

    pub fn free_text(messages: Vec<ChatMessage>) -> Self {
        Self::new(messages, GenerationMode::FreeText)
    }

    pub fn structured(messages: Vec<ChatMessage>) -> Self {
        Self::new(messages, GenerationMode::Structured)
    }

    /// 指定首选模型
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// 校验请求：消息非空且至少包含一条 user 消息
    pub fn validate(&self) -> Result<(), GenerationFailure> {
        if self.messages.is_empty() {
            return Err(GenerationFailure::InvalidRequest(
                "messages 不能为空".to_string(),
            ));
        }
        if !self.messages.iter().any(|m| m.role == Role::User) {
            return Err(GenerationFailure::InvalidRequest(
                "messages 中至少需要一条 user 消息".to_string(),
            ));
        }
        Ok(())
    }

    /// 最后一条消息是否为 user
    pub fn ends_with_user(&self) -> bool {
        self.messages
            .last()
            .map(|m| m.role == Role::User)
            .unwrap_or(false)
    }
}
