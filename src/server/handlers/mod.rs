//! 请求处理器

mod generate;

pub use generate::{generate, method_not_allowed, RelayPayload};
