//! 生成错误类型
//!
//! 定义一次生成请求从建立上游连接到拿到首个增量之间可能发生的错误。
//! 流开始之后的中断不属于错误，见 [`crate::client::Completion`]。

use thiserror::Error;

/// 生成失败
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationFailure {
    /// 配置错误（例如缺少 API Key）
    #[error("配置错误: {0}")]
    Configuration(String),

    /// 请求本身不合法
    #[error("无效请求: {0}")]
    InvalidRequest(String),

    /// 上游返回非 2xx 状态
    #[error("上游拒绝请求: HTTP {status} - {body}")]
    UpstreamRejected { status: u16, body: String },

    /// 首字节超时
    #[error("首字节超时: 模型 {model} 在 {timeout_ms}ms 内未返回内容")]
    Timeout { model: String, timeout_ms: u64 },

    /// 传输错误（连接被拒绝、首个增量前连接中断等）
    #[error("传输错误: {0}")]
    Transport(String),

    /// 降级计划耗尽
    #[error("降级计划耗尽: 尝试 {attempts} 次后失败, 最后错误: {last}")]
    PlanExhausted {
        attempts: u32,
        last: Box<GenerationFailure>,
    },

    /// 请求被取消
    #[error("请求已取消")]
    Cancelled,
}

impl GenerationFailure {
    /// 获取对应的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            GenerationFailure::Configuration(_) => 500,
            GenerationFailure::InvalidRequest(_) => 400,
            GenerationFailure::UpstreamRejected { status, .. } => *status,
            GenerationFailure::Timeout { .. } => 504,
            GenerationFailure::Transport(_) => 502,
            GenerationFailure::PlanExhausted { last, .. } => last.status_code(),
            GenerationFailure::Cancelled => 499,
        }
    }

    /// 获取错误类型字符串
    pub fn error_type(&self) -> &'static str {
        match self {
            GenerationFailure::Configuration(_) => "config_error",
            GenerationFailure::InvalidRequest(_) => "invalid_request",
            GenerationFailure::UpstreamRejected { .. } => "upstream_rejected",
            GenerationFailure::Timeout { .. } => "timeout_error",
            GenerationFailure::Transport(_) => "transport_error",
            GenerationFailure::PlanExhausted { .. } => "plan_exhausted",
            GenerationFailure::Cancelled => "cancelled",
        }
    }

    /// 上游返回的状态码（如果有）
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            GenerationFailure::UpstreamRejected { status, .. } => Some(*status),
            GenerationFailure::PlanExhausted { last, .. } => last.upstream_status(),
            _ => None,
        }
    }

    /// 转换为 JSON 错误响应
    ///
    /// 与中继接口约定一致，顶层只有 `error` 字符串，类型放在 `type` 字段。
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.to_string(),
            "type": self.error_type(),
        })
    }

    /// 记录带上下文的错误日志
    pub fn log_with_context(&self, request_id: &str, model: &str) {
        tracing::error!(
            request_id = %request_id,
            model = %model,
            error_type = %self.error_type(),
            error_message = %crate::logger::sanitize_log_message(&self.to_string()),
            "Generation failed"
        );
    }
}
