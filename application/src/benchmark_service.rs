use domain::metrics::{BenchmarkResult, StreamingMetrics};
use domain::models::{ChatRequest, Role};
use infrastructure::openai_client::OpenAiClient;
use shared::telemetry::Telemetry;
use shared::types::Result;

pub const DEFAULT_SYSTEM_PROMPT: &str = "A chat between a curious user and an artificial intelligence assistant. \
The assistant gives helpful, detailed, and polite answers to the user's questions.";

/// Mistral Instruct prompt format. `{input}` is replaced by the user text.
pub const DEFAULT_TEMPLATE: &str = "<s>[INST] {input} [/INST]";

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub input: String,
    pub max_tokens: u32,
    pub stream: bool,
    pub system: String,
    /// `None` sends the input unwrapped.
    pub template: Option<String>,
}

impl ChatSettings {
    pub fn user_prompt(&self) -> String {
        match &self.template {
            Some(template) => template.replace("{input}", &self.input),
            None => self.input.clone(),
        }
    }

    pub fn build_request(&self) -> ChatRequest {
        let mut request = ChatRequest::new(&self.model, self.max_tokens, self.stream);
        if !self.system.is_empty() {
            request = request.with_message(Role::System, &self.system);
        }
        request.with_message(Role::User, self.user_prompt())
    }
}

/// Times one chat completion request.
pub struct BenchmarkService {
    client: OpenAiClient,
}

impl BenchmarkService {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }

    /// Streams when `request.stream` is set; `on_chunk` sees every non-empty
    /// chunk as it arrives.
    pub async fn run<F>(&self, request: &ChatRequest, on_chunk: F) -> Result<BenchmarkResult>
    where
        F: FnMut(&str),
    {
        if request.stream {
            self.run_streaming(request, on_chunk).await
        } else {
            self.run_blocking(request).await
        }
    }

    async fn run_blocking(&self, request: &ChatRequest) -> Result<BenchmarkResult> {
        let telemetry = Telemetry::new();
        let content = self.client.chat(request).await?;
        let response_time = telemetry.elapsed();
        tracing::info!(
            response_ms = response_time.as_millis() as u64,
            "chat completion received"
        );
        Ok(BenchmarkResult::non_streaming(response_time, content))
    }

    async fn run_streaming<F>(
        &self,
        request: &ChatRequest,
        mut on_chunk: F,
    ) -> Result<BenchmarkResult>
    where
        F: FnMut(&str),
    {
        let mut metrics = StreamingMetrics::new();
        let mut content = String::new();
        let telemetry = Telemetry::new();
        metrics.start()?;

        if let Err(err) = self
            .consume(request, &telemetry, &mut metrics, &mut content, &mut on_chunk)
            .await
        {
            tracing::warn!(
                state = metrics.state().name(),
                chunks = metrics.chunk_count(),
                "chat stream failed"
            );
            if !metrics.state().is_terminal() {
                metrics.fail()?;
            }
            return Err(err);
        }

        let result = metrics.into_result(content)?;
        tracing::info!(
            chunks = result.chunk_count.unwrap_or(0),
            first_ms = result.first_response_time.map(|d| d.as_millis() as u64),
            response_ms = result.response_time.as_millis() as u64,
            "chat stream completed"
        );
        Ok(result)
    }

    async fn consume<F>(
        &self,
        request: &ChatRequest,
        telemetry: &Telemetry,
        metrics: &mut StreamingMetrics,
        content: &mut String,
        on_chunk: &mut F,
    ) -> Result<()>
    where
        F: FnMut(&str),
    {
        let mut stream = self.client.chat_stream(request).await?;
        while let Some(delta) = stream.next_delta().await? {
            if metrics.record_chunk(telemetry.elapsed(), &delta)? {
                on_chunk(&delta);
                content.push_str(&delta);
            }
        }
        metrics.complete(telemetry.elapsed())
    }
}
