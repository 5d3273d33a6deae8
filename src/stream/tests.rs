//! 流式处理层测试
//!
//! - 解码器属性测试（proptest）
//! - 中继对接本地模拟上游的集成测试

use crate::error::GenerationFailure;
use crate::models::{ChatMessage, GenerationRequest};
use crate::providers::{DashScopeAdapter, ProviderKind};
use crate::stream::{RelayChunk, SseDecoder, StreamEvent, StreamRelay};
use crate::test_support::{
    dashscope_frame, done_frame, refused_url, spawn_upstream, stream_of, Script, Step,
};
use futures::StreamExt;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn decode_chunks(chunks: &[&[u8]]) -> Vec<StreamEvent> {
    let mut decoder = SseDecoder::new(Arc::new(DashScopeAdapter::new()));
    let mut events = Vec::new();
    for chunk in chunks {
        events.extend(decoder.decode(chunk));
    }
    events.extend(decoder.finish());
    events
}

fn arb_line() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => "[a-z你好，。 ]{0,8}".prop_map(|s| dashscope_frame(&s)),
        1 => Just("data: {broken json\n\n".to_string()),
        1 => Just(": keep-alive\n".to_string()),
        1 => Just("event: result\nid: 7\n".to_string()),
        1 => Just("data: {\"request_id\":\"r\"}\r\n\r\n".to_string()),
    ]
}

proptest! {
    /// 任意切分方式得到的事件序列与整体解码一致
    #[test]
    fn prop_decoder_chunk_boundary_independent(
        lines in prop::collection::vec(arb_line(), 0..12),
        with_done in any::<bool>(),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..10),
    ) {
        let mut input = lines.concat();
        if with_done {
            input.push_str(&done_frame());
            input.push_str(&dashscope_frame("after done"));
        }
        let bytes = input.as_bytes();

        let whole = decode_chunks(&[bytes]);

        let mut offsets: Vec<usize> = cuts.iter().map(|i| i.index(bytes.len() + 1)).collect();
        offsets.sort_unstable();
        offsets.dedup();
        let mut chunks: Vec<&[u8]> = Vec::new();
        let mut start = 0;
        for offset in offsets {
            chunks.push(&bytes[start..offset]);
            start = offset;
        }
        chunks.push(&bytes[start..]);

        let chunked = decode_chunks(&chunks);
        prop_assert_eq!(whole, chunked);
    }

    /// [DONE] 只产生一个结束事件，且其后没有任何事件
    #[test]
    fn prop_done_yields_single_trailing_terminator(
        before in prop::collection::vec("[a-z]{1,6}", 0..6),
        after in prop::collection::vec("[a-z]{1,6}", 0..6),
    ) {
        let mut input: String = before.iter().map(|s| dashscope_frame(s)).collect();
        input.push_str(&done_frame());
        input.extend(after.iter().map(|s| dashscope_frame(s)));
        input.push_str(&done_frame());

        let events = decode_chunks(&[input.as_bytes()]);
        let terminators = events.iter().filter(|e| e.is_terminator()).count();

        prop_assert_eq!(terminators, 1);
        prop_assert_eq!(events.last(), Some(&StreamEvent::Terminator));
        prop_assert_eq!(events.len(), before.len() + 1);
    }

    /// 非 JSON 帧不会中断后续解码
    #[test]
    fn prop_malformed_frames_never_halt(
        garbage in "[a-z{}:\\[ ]{1,12}",
        tail in "[a-z]{1,6}",
    ) {
        prop_assume!(serde_json::from_str::<serde_json::Value>(&garbage).is_err());
        prop_assume!(garbage.trim() != "[DONE]");
        // 空白载荷按结束标记处理
        prop_assume!(!garbage.trim().is_empty());

        let input = format!("data: {}\n\n{}", garbage, dashscope_frame(&tail));
        let events = decode_chunks(&[input.as_bytes()]);

        let is_malformed = matches!(events.first(), Some(StreamEvent::Malformed { .. }));
        prop_assert!(is_malformed);
        prop_assert_eq!(events.last(), Some(&StreamEvent::Delta(tail)));
    }
}

fn request() -> GenerationRequest {
    GenerationRequest::free_text(vec![ChatMessage::user("hi")])
}

fn relay_for(url: &str) -> StreamRelay {
    StreamRelay::new(
        reqwest::Client::new(),
        ProviderKind::Dashscope,
        Arc::from("sk-test"),
    )
    .with_endpoint(url)
}

#[test]
fn test_relay_uses_provider_default_endpoint() {
    let relay = StreamRelay::new(
        reqwest::Client::new(),
        ProviderKind::OpenaiCompat,
        Arc::from("sk-test"),
    );
    assert_eq!(relay.provider_name(), "openai_compat");
    assert_eq!(relay.endpoint(), crate::providers::OPENAI_COMPAT_ENDPOINT);

    let relay = relay.with_endpoint("http://127.0.0.1:1/v1");
    assert_eq!(relay.endpoint(), "http://127.0.0.1:1/v1");
}

#[tokio::test]
async fn test_relay_forwards_deltas_in_order() {
    let upstream = spawn_upstream(vec![("*", stream_of(&["Hel", "Hello"]))]).await;
    let relay = relay_for(&upstream.url);

    let chunks: Vec<RelayChunk> = relay.open(&request(), "qwen-plus").await.unwrap().collect().await;

    assert_eq!(
        chunks,
        vec![
            RelayChunk::Delta("Hel".to_string()),
            RelayChunk::Delta("Hello".to_string())
        ]
    );
}

#[tokio::test]
async fn test_relay_sends_credential_and_sse_header() {
    let upstream = spawn_upstream(vec![("*", stream_of(&["x"]))]).await;
    let relay = relay_for(&upstream.url);

    let _: Vec<RelayChunk> = relay.open(&request(), "qwen-max").await.unwrap().collect().await;

    let recorded = upstream.requests();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].authorization.as_deref(), Some("Bearer sk-test"));
    assert_eq!(recorded[0].dashscope_sse.as_deref(), Some("enable"));
    assert_eq!(recorded[0].body["model"], "qwen-max");
    assert_eq!(recorded[0].body["parameters"]["incremental_output"], true);
}

#[tokio::test]
async fn test_relay_rejected_status_returns_error_before_stream() {
    let upstream = spawn_upstream(vec![(
        "*",
        Script::Status(401, "{\"code\":\"InvalidApiKey\"}".to_string()),
    )])
    .await;
    let relay = relay_for(&upstream.url);

    match relay.open(&request(), "qwen-plus").await {
        Err(GenerationFailure::UpstreamRejected { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("InvalidApiKey"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("rejected upstream must not produce a stream"),
    }
}

#[tokio::test]
async fn test_relay_connection_refused_is_transport_error() {
    let relay = relay_for(&refused_url().await);
    let result = relay.open(&request(), "qwen-plus").await;
    assert!(matches!(result, Err(GenerationFailure::Transport(_))));
}

#[tokio::test]
async fn test_relay_invalid_request_rejected_locally() {
    let upstream = spawn_upstream(vec![("*", stream_of(&["x"]))]).await;
    let relay = relay_for(&upstream.url);

    let empty = GenerationRequest::free_text(vec![]);
    assert!(matches!(
        relay.open(&empty, "qwen-plus").await,
        Err(GenerationFailure::InvalidRequest(_))
    ));
    assert!(upstream.requests().is_empty());
}

#[tokio::test]
async fn test_relay_mid_stream_drop_yields_interrupted() {
    let upstream = spawn_upstream(vec![(
        "*",
        Script::Stream(vec![
            Step::Raw(dashscope_frame("Hel")),
            Step::Sleep(50),
            Step::Abort,
        ]),
    )])
    .await;
    let relay = relay_for(&upstream.url);

    let chunks: Vec<RelayChunk> = relay.open(&request(), "qwen-plus").await.unwrap().collect().await;

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0], RelayChunk::Delta("Hel".to_string()));
    assert!(matches!(chunks[1], RelayChunk::Interrupted(_)));
}

#[tokio::test]
async fn test_relay_skips_malformed_frames() {
    let upstream = spawn_upstream(vec![(
        "*",
        Script::Stream(vec![
            Step::Raw(dashscope_frame("a")),
            Step::Raw("data: {oops\n\n".to_string()),
            Step::Raw(dashscope_frame("b")),
            Step::Raw(done_frame()),
        ]),
    )])
    .await;
    let relay = relay_for(&upstream.url);

    let chunks: Vec<RelayChunk> = relay.open(&request(), "qwen-plus").await.unwrap().collect().await;
    assert_eq!(
        chunks,
        vec![
            RelayChunk::Delta("a".to_string()),
            RelayChunk::Delta("b".to_string())
        ]
    );
}

#[tokio::test]
async fn test_relay_clean_close_without_sentinel() {
    let upstream = spawn_upstream(vec![(
        "*",
        Script::Stream(vec![Step::Raw(dashscope_frame("only"))]),
    )])
    .await;
    let relay = relay_for(&upstream.url);

    let chunks: Vec<RelayChunk> = relay.open(&request(), "qwen-plus").await.unwrap().collect().await;
    assert_eq!(chunks, vec![RelayChunk::Delta("only".to_string())]);
}

#[tokio::test]
async fn test_dropping_relay_stream_cancels_upstream() {
    let mut steps = Vec::new();
    for i in 0..100 {
        steps.push(Step::Raw(dashscope_frame(&format!("part{i}"))));
        steps.push(Step::Sleep(50));
    }
    let upstream = spawn_upstream(vec![("*", Script::Stream(steps))]).await;
    let relay = relay_for(&upstream.url);

    let mut stream = relay.open(&request(), "qwen-plus").await.unwrap();
    assert_eq!(stream.next().await, Some(RelayChunk::Delta("part0".to_string())));
    drop(stream);

    assert!(upstream.wait_body_dropped(Duration::from_secs(3)).await);
}
