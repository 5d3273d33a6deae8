//! 降级计划
//!
//! 有序的 (模型, 首字节超时) 列表。按顺序尝试，只有可重试的失败才会切换到下一项，
//! 两次尝试之间按指数退避加抖动等待。

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// 默认可重试的 HTTP 状态码（网关超时）
pub const RETRYABLE_STATUS_CODES: &[u16] = &[504];

/// 计划中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub model: String,
    /// 建立连接并收到首个增量的时限（毫秒）
    pub first_byte_timeout_ms: u64,
}

impl PlanEntry {
    pub fn new(model: impl Into<String>, first_byte_timeout_ms: u64) -> Self {
        Self {
            model: model.into(),
            first_byte_timeout_ms,
        }
    }

    pub fn first_byte_timeout(&self) -> Duration {
        Duration::from_millis(self.first_byte_timeout_ms)
    }
}

/// 计划构建错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("降级计划至少需要一项")]
    Empty,

    #[error("降级计划第 {index} 项的首字节超时必须大于 0")]
    ZeroTimeout { index: usize },
}

/// 降级计划
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPlan {
    entries: Vec<PlanEntry>,
    retryable_codes: Vec<u16>,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

impl RetryPlan {
    pub fn new(entries: Vec<PlanEntry>) -> Result<Self, PlanError> {
        if entries.is_empty() {
            return Err(PlanError::Empty);
        }
        if let Some(index) = entries.iter().position(|e| e.first_byte_timeout_ms == 0) {
            return Err(PlanError::ZeroTimeout { index });
        }
        Ok(Self {
            entries,
            retryable_codes: RETRYABLE_STATUS_CODES.to_vec(),
            base_delay_ms: 200,
            max_delay_ms: 2000,
        })
    }

    /// 单模型计划
    pub fn single(model: impl Into<String>, first_byte_timeout_ms: u64) -> Result<Self, PlanError> {
        Self::new(vec![PlanEntry::new(model, first_byte_timeout_ms)])
    }

    pub fn with_retryable_codes(mut self, codes: Vec<u16>) -> Self {
        self.retryable_codes = codes;
        self
    }

    /// 设置切换间隔的退避参数，`base_delay_ms = 0` 表示立即切换
    pub fn with_backoff(mut self, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self.max_delay_ms = max_delay_ms.max(base_delay_ms);
        self
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_codes.contains(&status)
    }

    /// 把首选模型移到计划最前面
    ///
    /// 计划中已有该模型时沿用其超时，否则使用第一项的超时。
    pub fn prefer(&self, model: &str) -> Self {
        let mut plan = self.clone();
        match plan.entries.iter().position(|e| e.model == model) {
            Some(0) => {}
            Some(index) => {
                let entry = plan.entries.remove(index);
                plan.entries.insert(0, entry);
            }
            None => {
                let timeout = plan.entries[0].first_byte_timeout_ms;
                plan.entries.insert(0, PlanEntry::new(model, timeout));
            }
        }
        plan
    }

    /// 第 `switch` 次切换前的等待时间（指数退避 + 抖动）
    pub fn switch_delay(&self, switch: u32) -> Duration {
        self.switch_delay_with_jitter(switch, rand_jitter_factor())
    }

    /// 计算退避时间（可指定抖动因子，用于测试）
    ///
    /// 公式: min(base * 2^switch + base * jitter, max)，jitter 取值 [0.0, 1.0)
    pub fn switch_delay_with_jitter(&self, switch: u32, jitter_factor: f64) -> Duration {
        let base = self.base_delay_ms as f64;
        let max = self.max_delay_ms as f64;

        let exponential = base * 2_f64.powi(switch.min(31) as i32);
        let jitter = base * jitter_factor.clamp(0.0, 1.0);
        let delay = (exponential + jitter).min(max);

        Duration::from_millis(delay as u64)
    }
}

/// 生成 [0.0, 1.0) 范围内的抖动因子
fn rand_jitter_factor() -> f64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64,
    );

    (hasher.finish() as f64) / (u64::MAX as f64)
}
