//! classcast
//!
//! 课堂助手的 AI 生成网关：把上游大模型的 SSE 流中继成纯文本增量流，
//! 客户端负责累加、按计划降级模型，并从最终文本中提取结构化结果。

pub mod client;
pub mod config;
pub mod error;
pub mod extractor;
pub mod logger;
pub mod models;
pub mod providers;
pub mod resilience;
pub mod server;
pub mod server_utils;
pub mod stream;
pub mod tasks;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{GenerationClient, GenerationOutput, GenerationUpdate};
pub use config::AppConfig;
pub use error::GenerationFailure;
