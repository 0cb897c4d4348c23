//! Mock endpoints shared by the end-to-end tests.

use domain::models::Endpoint;
use infrastructure::openai_client::OpenAiClient;
use reqwest::Client;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mock `/v1/embeddings` answering every request with `vector`.
pub async fn embeddings_server(vector: &[f32]) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": vector}],
            "model": "BAAI/bge-large-en-v1.5"
        })))
        .mount(&server)
        .await;
    server
}

/// SSE body: a role-only chunk, one chunk per token, a finish chunk, `[DONE]`.
pub fn sse_body(tokens: &[&str]) -> String {
    let mut body = String::from(
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n",
    );
    for token in tokens {
        let chunk = serde_json::json!({
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": token}}]
        });
        body.push_str(&format!("data: {chunk}\n\n"));
    }
    body.push_str(
        "data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
    );
    body.push_str("data: [DONE]\n\n");
    body
}

/// Mock streaming `/v1/chat/completions` delayed by `delay`.
pub async fn streaming_chat_server(tokens: &[&str], delay: Duration) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body(tokens))
                .set_delay(delay),
        )
        .mount(&server)
        .await;
    server
}

pub fn openai_client(server: &MockServer, model: &str) -> OpenAiClient {
    OpenAiClient::new(
        Client::new(),
        Endpoint::new(format!("{}/v1", server.uri()), "test"),
        model,
    )
}
