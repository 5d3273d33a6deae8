//! 生成客户端
//!
//! - `transport`: 进程内中继 / HTTP 中继两种传输
//! - `generation_client`: 累加、降级与结构化后处理

pub mod generation_client;
pub mod transport;

pub use generation_client::{
    ClientError, Completion, GenerationClient, GenerationOutput, GenerationResult,
    GenerationStream, GenerationUpdate, StructuredOutput,
};
pub use transport::{GenerationTransport, HttpRelayTransport};
