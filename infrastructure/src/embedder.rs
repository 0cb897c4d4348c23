use domain::models::Embedding;
use domain::source::EmbeddingSource;
use futures::stream::{self, StreamExt, TryStreamExt};
use shared::error::BenchError;
use shared::telemetry::Telemetry;
use shared::types::Result;

/// Fans one input text out to every configured embedding source.
pub struct Embedder {
    sources: Vec<Box<dyn EmbeddingSource>>,
}

impl Embedder {
    pub fn new(sources: Vec<Box<dyn EmbeddingSource>>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[Box<dyn EmbeddingSource>] {
        &self.sources
    }

    /// `text` repeated `batch` times in a single request; one embedding per row.
    pub async fn embed(
        source: &dyn EmbeddingSource,
        text: &str,
        batch: usize,
    ) -> Result<Vec<Embedding>> {
        let inputs = vec![text.to_string(); batch];
        let telemetry = Telemetry::new();
        let rows = source.embed_batch(&inputs).await?;
        if rows.len() != batch {
            return Err(BenchError::Shape(format!(
                "{} returned {} embeddings for a batch of {batch}",
                source.label(),
                rows.len()
            )));
        }
        tracing::info!(
            source = source.label(),
            elapsed_ms = telemetry.elapsed().as_millis() as u64,
            dimensions = rows.first().map(Vec::len).unwrap_or(0),
            "embedding received"
        );
        Ok(rows
            .into_iter()
            .map(|vector| Embedding::new(source.label(), source.kind(), vector))
            .collect())
    }

    /// One entry per source, in source order. Sequential unless `concurrent`,
    /// in which case every request is in flight at once and the first failure
    /// aborts the lot.
    pub async fn embed_all(
        &self,
        text: &str,
        batch: usize,
        concurrent: bool,
    ) -> Result<Vec<Vec<Embedding>>> {
        if !concurrent {
            let mut embeddings = Vec::with_capacity(self.sources.len());
            for source in &self.sources {
                embeddings.push(Self::embed(source.as_ref(), text, batch).await?);
            }
            return Ok(embeddings);
        }

        let futures: Vec<_> = self
            .sources
            .iter()
            .map(|source| Self::embed(source.as_ref(), text, batch))
            .collect();
        stream::iter(futures)
            .buffered(self.sources.len().max(1))
            .try_collect()
            .await
    }
}
