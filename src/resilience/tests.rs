//! 容错机制属性测试
//!
//! 使用 proptest 进行属性测试

use crate::resilience::{PlanEntry, RetryPlan};
use proptest::prelude::*;
use std::time::Duration;

/// 生成有效的降级计划
fn arb_plan() -> impl Strategy<Value = RetryPlan> {
    (
        prop::collection::vec(("[a-z]{3,8}", 1u64..=60_000u64), 1..5),
        0u64..=500u64,
        0u64..=5000u64,
    )
        .prop_map(|(entries, base_delay_ms, max_delay_ms)| {
            let entries = entries
                .into_iter()
                .map(|(model, timeout)| PlanEntry::new(model, timeout))
                .collect();
            RetryPlan::new(entries)
                .unwrap()
                .with_backoff(base_delay_ms, max_delay_ms)
        })
}

proptest! {
    /// 切换间隔不超过配置的最大值
    #[test]
    fn prop_switch_delay_capped(
        plan in arb_plan(),
        switch in 0u32..64u32,
        jitter in 0.0f64..1.0f64,
    ) {
        let delay = plan.switch_delay_with_jitter(switch, jitter);
        let max = plan.switch_delay_with_jitter(u32::MAX, 1.0);
        prop_assert!(delay <= max);
    }

    /// 无抖动时切换间隔随切换次数单调不减
    #[test]
    fn prop_switch_delay_monotonic(
        plan in arb_plan(),
        switch in 0u32..16u32,
    ) {
        let current = plan.switch_delay_with_jitter(switch, 0.0);
        let next = plan.switch_delay_with_jitter(switch + 1, 0.0);
        prop_assert!(next >= current);
    }

    /// prefer 后首选模型在最前，其余模型相对顺序不变
    #[test]
    fn prop_prefer_keeps_relative_order(
        plan in arb_plan(),
        pick in any::<prop::sample::Index>(),
    ) {
        let models: Vec<String> = plan.entries().iter().map(|e| e.model.clone()).collect();
        let chosen = models[pick.index(models.len())].clone();

        let preferred = plan.prefer(&chosen);
        prop_assert_eq!(&preferred.entries()[0].model, &chosen);
        prop_assert_eq!(preferred.len(), plan.len());

        let original_rest: Vec<&String> = {
            let mut seen = false;
            models
                .iter()
                .filter(|m| {
                    if !seen && **m == chosen {
                        seen = true;
                        false
                    } else {
                        true
                    }
                })
                .collect()
        };
        let preferred_rest: Vec<&String> =
            preferred.entries()[1..].iter().map(|e| &e.model).collect();
        prop_assert_eq!(original_rest, preferred_rest);
    }
}

#[test]
fn test_first_byte_timeout_duration() {
    let entry = PlanEntry::new("qwen-plus", 1500);
    assert_eq!(entry.first_byte_timeout(), Duration::from_millis(1500));
}
