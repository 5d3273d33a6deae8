//! 流事件类型
//!
//! 解码器的输出。同一请求内事件严格有序，`Terminator` 出现时一定是最后一个。

use serde::{Deserialize, Serialize};

/// 解码后的流事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// 非空的增量文本
    Delta(String),

    /// 流的逻辑结束（结束标记或空 payload）
    Terminator,

    /// 无法解析的帧，仅记录日志，不中断流
    Malformed {
        /// 原始 payload
        payload: String,
        /// 解析失败原因
        reason: String,
    },
}

impl StreamEvent {
    pub fn delta(text: impl Into<String>) -> Self {
        StreamEvent::Delta(text.into())
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self, StreamEvent::Terminator)
    }

    /// 如果是增量事件，返回文本
    pub fn as_delta(&self) -> Option<&str> {
        match self {
            StreamEvent::Delta(text) => Some(text),
            _ => None,
        }
    }
}
