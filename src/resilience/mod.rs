//! 容错机制模块
//!
//! 提供降级计划、首字节超时和失败分类

mod failover;
mod retry;
mod timeout;

pub use failover::{DowngradeLog, FailureClass, SwitchEvent};
pub use retry::{PlanEntry, PlanError, RetryPlan, RETRYABLE_STATUS_CODES};
pub use timeout::{FirstByteTimeout, TimeoutController};

#[cfg(test)]
mod tests;
