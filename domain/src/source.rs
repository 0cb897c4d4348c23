use crate::models::SourceKind;
use async_trait::async_trait;
use shared::types::Result;

/// Anything that can turn text into embedding vectors.
#[async_trait]
pub trait EmbeddingSource: Send + Sync {
    /// Human readable name used in reports, usually the URL or file path.
    fn label(&self) -> &str;

    fn kind(&self) -> SourceKind;

    /// One vector per input, in input order.
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>>;
}
