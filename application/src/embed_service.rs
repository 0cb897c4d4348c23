use infrastructure::openai_client::OpenAiClient;
use shared::error::BenchError;
use shared::telemetry::Telemetry;
use shared::types::Result;
use std::time::Duration;

#[derive(Debug)]
pub struct EmbedReport {
    pub vectors: Vec<Vec<f32>>,
    pub elapsed: Duration,
}

/// One-shot embeddings request with its round-trip time.
pub struct EmbedService {
    client: OpenAiClient,
}

impl EmbedService {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }

    pub async fn run(&self, inputs: &[String]) -> Result<EmbedReport> {
        if inputs.is_empty() {
            return Err(BenchError::Config("at least one input is required".into()));
        }
        let telemetry = Telemetry::new();
        let vectors = self.client.create_embeddings(inputs).await?;
        let elapsed = telemetry.elapsed();
        if vectors.len() != inputs.len() {
            return Err(BenchError::Shape(format!(
                "{} embeddings returned for {} inputs",
                vectors.len(),
                inputs.len()
            )));
        }
        Ok(EmbedReport { vectors, elapsed })
    }
}
