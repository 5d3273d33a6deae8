//! 首字节超时控制
//!
//! 超时只约束"建立连接并收到首个增量"这一阶段；一旦开始出字，
//! 不再施加任何空闲超时。

use std::future::Future;
use std::time::{Duration, Instant};

/// 超时错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstByteTimeout {
    pub timeout_ms: u64,
    pub elapsed_ms: u64,
}

impl std::fmt::Display for FirstByteTimeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "首字节超时: 配置 {}ms, 已耗时 {}ms",
            self.timeout_ms, self.elapsed_ms
        )
    }
}

impl std::error::Error for FirstByteTimeout {}

/// 超时控制器
#[derive(Debug, Clone, Copy)]
pub struct TimeoutController {
    first_byte_timeout: Duration,
}

impl TimeoutController {
    pub fn new(first_byte_timeout: Duration) -> Self {
        Self { first_byte_timeout }
    }

    pub fn first_byte_timeout(&self) -> Duration {
        self.first_byte_timeout
    }

    /// 带首字节超时执行异步操作
    pub async fn execute_with_timeout<F, T>(&self, operation: F) -> Result<T, FirstByteTimeout>
    where
        F: Future<Output = T>,
    {
        let start = Instant::now();

        tokio::time::timeout(self.first_byte_timeout, operation)
            .await
            .map_err(|_| FirstByteTimeout {
                timeout_ms: self.first_byte_timeout.as_millis() as u64,
                elapsed_ms: start.elapsed().as_millis() as u64,
            })
    }
}
