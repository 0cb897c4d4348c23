use crate::http::{ensure_success, parse_json, transport};
use async_trait::async_trait;
use bytes::Bytes;
use domain::models::{ChatRequest, Endpoint, SourceKind};
use domain::source::EmbeddingSource;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::error::BenchError;
use shared::types::Result;

#[derive(Serialize)]
#[serde(untagged)]
enum EmbeddingInput<'a> {
    Single(&'a str),
    Batch(&'a [String]),
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: EmbeddingInput<'a>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

/// Client for an OpenAI-compatible REST API.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    endpoint: Endpoint,
    model: String,
}

impl OpenAiClient {
    pub fn new(client: Client, endpoint: Endpoint, model: impl Into<String>) -> Self {
        Self {
            client,
            endpoint,
            model: model.into(),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// `POST /embeddings`. A single input is sent as a bare string, several
    /// as an array.
    pub async fn create_embeddings(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self.endpoint.url("embeddings");
        let input = match inputs {
            [single] => EmbeddingInput::Single(single),
            batch => EmbeddingInput::Batch(batch),
        };
        let request = EmbeddingRequest {
            model: &self.model,
            input,
        };
        tracing::debug!(%url, batch = inputs.len(), "embeddings request");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.endpoint.api_key)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;
        let response = ensure_success(response, &self.model).await?;
        let mut body: EmbeddingResponse = parse_json(response, "embeddings").await?;
        body.data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));
        Ok(body.data.into_iter().map(|d| d.embedding).collect())
    }

    /// Non-streaming `POST /chat/completions`; returns the first choice's text.
    pub async fn chat(&self, request: &ChatRequest) -> Result<String> {
        let response = self.send_chat(request, false).await?;
        let body: ChatResponse = parse_json(response, "chat completion").await?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BenchError::Shape("chat completion has no choices".into()))?;
        Ok(choice.message.content.unwrap_or_default())
    }

    /// Streaming `POST /chat/completions`. Returns once the response headers
    /// arrived; chunks are pulled from the returned [`ChatStream`].
    pub async fn chat_stream(&self, request: &ChatRequest) -> Result<ChatStream> {
        let response = self.send_chat(request, true).await?;
        Ok(ChatStream::new(response.bytes_stream().boxed()))
    }

    async fn send_chat(&self, request: &ChatRequest, stream: bool) -> Result<reqwest::Response> {
        let url = self.endpoint.url("chat/completions");
        let mut request = request.clone();
        request.stream = stream;
        tracing::debug!(%url, model = %request.model, stream, "chat completion request");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.endpoint.api_key)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;
        ensure_success(response, &request.model).await
    }

    /// `GET /models`.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = self.endpoint.url("models");
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.endpoint.api_key)
            .send()
            .await
            .map_err(transport)?;
        let response = ensure_success(response, &self.model).await?;
        let body: ModelList = parse_json(response, "model list").await?;
        Ok(body.data.into_iter().map(|m| m.id).collect())
    }
}

#[async_trait]
impl EmbeddingSource for OpenAiClient {
    fn label(&self) -> &str {
        &self.endpoint.base_url
    }

    fn kind(&self) -> SourceKind {
        SourceKind::OpenAi
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        self.create_embeddings(inputs).await
    }
}

#[derive(Debug, PartialEq)]
enum SseLine {
    Delta(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> Result<SseLine> {
    let Some(data) = line.strip_prefix("data:") else {
        // comments, `event:`, `id:`, `retry:` and blank separators
        return Ok(SseLine::Skip);
    };
    let data = data.trim();
    if data.is_empty() {
        return Ok(SseLine::Skip);
    }
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }
    let value: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| BenchError::Shape(format!("unexpected stream chunk: {e}")))?;
    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(BenchError::request(None, message));
    }
    let chunk: ChatChunk = serde_json::from_value(value)
        .map_err(|e| BenchError::Shape(format!("unexpected stream chunk: {e}")))?;
    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
        .unwrap_or_default();
    Ok(SseLine::Delta(content))
}

/// Server-sent event stream of chat completion deltas.
pub struct ChatStream {
    inner: BoxStream<'static, reqwest::Result<Bytes>>,
    buffer: Vec<u8>,
    saw_data: bool,
    done: bool,
}

impl ChatStream {
    fn new(inner: BoxStream<'static, reqwest::Result<Bytes>>) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            saw_data: false,
            done: false,
        }
    }

    /// Next delta's content, possibly empty. `None` once the stream ended,
    /// either through `[DONE]` or connection close. A body that closes
    /// without a single `data:` line is a shape error.
    pub async fn next_delta(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                match parse_sse_line(line.trim())? {
                    SseLine::Delta(content) => {
                        self.saw_data = true;
                        return Ok(Some(content));
                    }
                    SseLine::Done => {
                        self.done = true;
                        self.buffer.clear();
                        return Ok(None);
                    }
                    SseLine::Skip => continue,
                }
            }
            if self.done {
                return Ok(None);
            }
            match self.inner.next().await {
                Some(Ok(bytes)) => self.buffer.extend_from_slice(&bytes),
                Some(Err(e)) => return Err(transport(e)),
                None => {
                    self.done = true;
                    // last line without trailing newline
                    let rest = std::mem::take(&mut self.buffer);
                    let rest = String::from_utf8_lossy(&rest);
                    return match parse_sse_line(rest.trim())? {
                        SseLine::Delta(content) => {
                            self.saw_data = true;
                            Ok(Some(content))
                        }
                        SseLine::Done => Ok(None),
                        SseLine::Skip if !self.saw_data => Err(BenchError::Shape(
                            "response is not an event stream".into(),
                        )),
                        SseLine::Skip => Ok(None),
                    };
                }
            }
        }
    }
}
