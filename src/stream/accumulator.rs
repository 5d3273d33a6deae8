//! 增量累加器
//!
//! 每个进行中的请求独占一个，只追加不修改。

/// 增量累加器
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    text: String,
    deltas: usize,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个增量，返回当前完整快照
    pub fn push(&mut self, delta: &str) -> &str {
        self.text.push_str(delta);
        self.deltas += 1;
        &self.text
    }

    pub fn snapshot(&self) -> &str {
        &self.text
    }

    /// 已接收的增量个数
    pub fn delta_count(&self) -> usize {
        self.deltas
    }

    pub fn is_empty(&self) -> bool {
        self.deltas == 0
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
