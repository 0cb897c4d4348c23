use application::benchmark_service::{BenchmarkService, ChatSettings, DEFAULT_SYSTEM_PROMPT};
use shared::error::BenchError;
use std::time::Duration;
use tests::{openai_client, streaming_chat_server};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "Mistral-7B-Instruct-v0.2";

fn settings(stream: bool) -> ChatSettings {
    ChatSettings {
        model: MODEL.into(),
        input: "What fun things are there to do in Chicago?".into(),
        max_tokens: 128,
        stream,
        system: DEFAULT_SYSTEM_PROMPT.into(),
        template: None,
    }
}

#[tokio::test]
async fn non_streaming_run_has_no_rate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(serde_json::json!({"stream": false, "model": MODEL})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "cmpl-1",
            "object": "chat.completion",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Visit Millennium Park."}, "finish_reason": "stop"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let service = BenchmarkService::new(openai_client(&server, MODEL));
    let result = service
        .run(&settings(false).build_request(), |_| {})
        .await
        .unwrap();
    assert!(!result.streaming);
    assert!(result.response_time >= Duration::ZERO);
    assert_eq!(result.tokens_per_second, None);
    assert_eq!(result.first_response_time, None);
    assert_eq!(result.content, "Visit Millennium Park.");
}

#[tokio::test]
async fn streaming_rate_counts_non_empty_chunks() {
    let tokens = ["Navy", " Pier", ",", " the", " Bean"];
    let server = streaming_chat_server(&tokens, Duration::from_millis(50)).await;

    let service = BenchmarkService::new(openai_client(&server, MODEL));
    let mut printed = Vec::new();
    let result = service
        .run(&settings(true).build_request(), |chunk| printed.push(chunk.to_string()))
        .await
        .unwrap();

    assert_eq!(printed, tokens);
    assert_eq!(result.content, "Navy Pier, the Bean");
    assert_eq!(result.chunk_count, Some(5));

    let response_time = result.response_time.as_secs_f64();
    assert!(response_time >= 0.05);
    let tps = result.tokens_per_second.unwrap();
    assert!((tps - 5.0 / response_time).abs() < 1e-9);

    let first = result.first_response_time.unwrap();
    assert!(first <= result.response_time);
}

#[tokio::test]
async fn unauthorized_request_fails_before_metrics() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"message": "Invalid API key", "type": "invalid_request_error", "code": "invalid_api_key"}
        })))
        .mount(&server)
        .await;

    let service = BenchmarkService::new(openai_client(&server, MODEL));
    for stream in [false, true] {
        let mut chunks = 0;
        let err = service
            .run(&settings(stream).build_request(), |_| chunks += 1)
            .await
            .unwrap_err();
        assert!(matches!(err, BenchError::Request { status: Some(401), .. }));
        assert_eq!(chunks, 0);
    }
}

#[tokio::test]
async fn unknown_chat_model_is_a_model_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": {"message": "model not found", "type": "invalid_request_error", "code": "model_not_found"}
        })))
        .mount(&server)
        .await;

    let service = BenchmarkService::new(openai_client(&server, MODEL));
    let err = service
        .run(&settings(true).build_request(), |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, BenchError::Model { .. }));
}
