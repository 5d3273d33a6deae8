//! SSE 增量解码器
//!
//! 上游的字节块可能在任意位置切断一行，甚至切断一个多字节 UTF-8 字符。
//! 解码器以字节为单位缓存未完成的行，只处理以 `\n` 结尾的完整行，
//! 因此无论上游如何分块，得到的事件序列都相同。

use super::events::StreamEvent;
use crate::providers::ProviderAdapter;
use serde_json::Value;
use std::sync::Arc;

/// SSE 解码器
///
/// 每个请求一个实例，不跨请求复用。
#[derive(Debug)]
pub struct SseDecoder {
    adapter: Arc<dyn ProviderAdapter>,
    buffer: Vec<u8>,
    terminated: bool,
}

impl SseDecoder {
    pub fn new(adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self {
            adapter,
            buffer: Vec::new(),
            terminated: false,
        }
    }

    /// 是否已遇到结束标记
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// 输入一个字节块，返回其中完整行产生的事件
    ///
    /// 遇到 `Terminator` 后停止处理，之后的输入全部忽略。
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.terminated {
            return events;
        }

        self.buffer.extend_from_slice(chunk);

        let mut consumed = 0;
        while let Some(pos) = self.buffer[consumed..].iter().position(|b| *b == b'\n') {
            let end = consumed + pos;
            let line = String::from_utf8_lossy(&self.buffer[consumed..end]).into_owned();
            consumed = end + 1;

            self.process_line(&line, &mut events);
            if self.terminated {
                break;
            }
        }

        if self.terminated {
            self.buffer.clear();
        } else {
            self.buffer.drain(..consumed);
        }

        events
    }

    /// 输入结束
    ///
    /// 没有换行结尾的残留片段不会被解析，以 `Malformed` 报告。
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.terminated || self.buffer.is_empty() {
            self.buffer.clear();
            return Vec::new();
        }

        let residual = String::from_utf8_lossy(&self.buffer).trim().to_string();
        self.buffer.clear();

        if residual.is_empty() {
            Vec::new()
        } else {
            vec![StreamEvent::Malformed {
                payload: residual,
                reason: "流结束时存在未以换行结尾的残留行".to_string(),
            }]
        }
    }

    fn process_line(&mut self, line: &str, events: &mut Vec<StreamEvent>) {
        let line = line.strip_suffix('\r').unwrap_or(line);

        // event:/id:/注释行/空分隔行 都不携带内容
        let Some(rest) = line.strip_prefix(self.adapter.event_prefix()) else {
            return;
        };

        let payload = rest.trim();
        if payload.is_empty() || payload == self.adapter.end_sentinel() {
            events.push(StreamEvent::Terminator);
            self.terminated = true;
            return;
        }

        match serde_json::from_str::<Value>(payload) {
            Ok(frame) => {
                let parsed = self.adapter.parse_frame(&frame);
                if let Some(delta) = parsed.delta {
                    events.push(StreamEvent::Delta(delta));
                }
                if parsed.finished {
                    events.push(StreamEvent::Terminator);
                    self.terminated = true;
                }
            }
            Err(e) => events.push(StreamEvent::Malformed {
                payload: payload.to_string(),
                reason: e.to_string(),
            }),
        }
    }
}
