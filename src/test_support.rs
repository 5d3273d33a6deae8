//! 测试辅助：本地模拟上游
//!
//! 在 127.0.0.1 的随机端口上启动一个 axum 服务，按模型名回放预设脚本。

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 流式响应中的一步
#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// 原样写出的文本
    Raw(String),
    /// 暂停若干毫秒
    Sleep(u64),
    /// 以错误结束响应体，模拟连接中断
    Abort,
}

/// 针对某个模型的响应脚本
#[derive(Debug, Clone)]
pub(crate) enum Script {
    Stream(Vec<Step>),
    Status(u16, String),
    /// 先等待再按内层脚本响应（模拟首字节前卡住）
    Delay(u64, Box<Script>),
}

/// 记录的上游请求
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub authorization: Option<String>,
    pub dashscope_sse: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct MockState {
    scripts: Arc<HashMap<String, Script>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    body_dropped: Arc<AtomicBool>,
}

/// 模拟上游句柄
#[derive(Clone)]
pub(crate) struct MockUpstream {
    pub url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    body_dropped: Arc<AtomicBool>,
}

impl MockUpstream {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// 按顺序返回请求中的模型名
    pub fn requested_models(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| r.body["model"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// 上游响应体是否已被丢弃（连接断开）
    pub async fn wait_body_dropped(&self, within: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + within;
        while tokio::time::Instant::now() < deadline {
            if self.body_dropped.load(Ordering::SeqCst) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.body_dropped.load(Ordering::SeqCst)
    }
}

/// DashScope 格式的一帧
pub(crate) fn dashscope_frame(content: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({"output": {"choices": [{"message": {"role": "assistant", "content": content}}]}})
    )
}

pub(crate) fn done_frame() -> String {
    "data: [DONE]\n\n".to_string()
}

/// 由文本增量构成的完整流脚本
pub(crate) fn stream_of(deltas: &[&str]) -> Script {
    let mut steps: Vec<Step> = deltas.iter().map(|d| Step::Raw(dashscope_frame(d))).collect();
    steps.push(Step::Raw(done_frame()));
    Script::Stream(steps)
}

/// 启动模拟上游。`scripts` 的键为模型名，`*` 匹配任意模型。
pub(crate) async fn spawn_upstream(scripts: Vec<(&str, Script)>) -> MockUpstream {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let body_dropped = Arc::new(AtomicBool::new(false));
    let state = MockState {
        scripts: Arc::new(
            scripts
                .into_iter()
                .map(|(model, script)| (model.to_string(), script))
                .collect(),
        ),
        requests: requests.clone(),
        body_dropped: body_dropped.clone(),
    };

    let app = Router::new()
        .route("/generation", post(handle))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockUpstream {
        url: format!("http://{}/generation", addr),
        requests,
        body_dropped,
    }
}

/// 一个当前没有监听者的本地地址
pub(crate) async fn refused_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/generation", addr)
}

async fn handle(State(state): State<MockState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let model = body["model"].as_str().unwrap_or_default().to_string();
    state.requests.lock().unwrap().push(RecordedRequest {
        authorization: header_value(&headers, "authorization"),
        dashscope_sse: header_value(&headers, "x-dashscope-sse"),
        body,
    });

    let mut script = state
        .scripts
        .get(&model)
        .or_else(|| state.scripts.get("*"))
        .cloned()
        .unwrap_or_else(|| Script::Status(404, format!("unknown model {}", model)));

    loop {
        match script {
            Script::Delay(ms, inner) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                script = *inner;
            }
            Script::Status(code, text) => {
                return (StatusCode::from_u16(code).unwrap(), text).into_response();
            }
            Script::Stream(steps) => {
                let flag = DropFlag(state.body_dropped.clone());
                let body = async_stream::stream! {
                    let _flag = flag;
                    for step in steps {
                        match step {
                            Step::Raw(text) => yield Ok::<Bytes, std::io::Error>(Bytes::from(text)),
                            Step::Sleep(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
                            Step::Abort => {
                                yield Err(std::io::Error::new(
                                    std::io::ErrorKind::ConnectionReset,
                                    "mock upstream abort",
                                ));
                                return;
                            }
                        }
                    }
                };
                return Response::builder()
                    .status(StatusCode::OK)
                    .header(header::CONTENT_TYPE, "text/event-stream")
                    .body(Body::from_stream(body))
                    .unwrap();
            }
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}
