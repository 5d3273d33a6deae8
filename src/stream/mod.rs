//! 流式处理层
//!
//! ```text
//! 上游 SSE 字节 ──> [SseDecoder] ──> StreamEvent ──> [StreamRelay] ──> RelayChunk ──> 调用方
//! ```
//!
//! # 模块结构
//!
//! - `events`: 解码器输出的事件类型
//! - `decoder`: 与分块边界无关的 SSE 解码器
//! - `relay`: 上游连接生命周期与增量转发
//! - `accumulator`: 请求内的增量累加

pub mod accumulator;
pub mod decoder;
pub mod events;
pub mod relay;

pub use accumulator::Accumulator;
pub use decoder::SseDecoder;
pub use events::StreamEvent;
pub use relay::{
    interruption_marker, RelayChunk, RelayStats, RelayStream, StreamRelay, INTERRUPTION_MARKER,
};

#[cfg(test)]
mod tests;
