use async_trait::async_trait;
use domain::models::SourceKind;
use domain::source::EmbeddingSource;
use serde::Deserialize;
use shared::error::BenchError;
use shared::types::Result;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum ReferencePayload {
    Vector(Vec<f32>),
    Rows(Vec<Vec<f32>>),
    Object { embedding: Vec<f32> },
    ObjectRows { embeddings: Vec<Vec<f32>> },
}

/// Embedding produced ahead of time by a locally run reference model.
///
/// The file holds either one vector (a bare array or `{"embedding": [...]}`)
/// or one row per batch entry (`[[...], ...]` or `{"embeddings": [...]}`).
pub struct ReferenceFile {
    label: String,
    rows: Vec<Vec<f32>>,
}

impl ReferenceFile {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let rows = Self::parse(&raw)?;
        tracing::debug!(path = %path.display(), rows = rows.len(), "loaded reference embedding");
        Ok(Self {
            label: path.display().to_string(),
            rows,
        })
    }

    fn parse(raw: &str) -> Result<Vec<Vec<f32>>> {
        let payload: ReferencePayload = serde_json::from_str(raw)
            .map_err(|e| BenchError::Shape(format!("unreadable reference embedding: {e}")))?;
        let rows = match payload {
            ReferencePayload::Vector(v) | ReferencePayload::Object { embedding: v } => vec![v],
            ReferencePayload::Rows(rows) | ReferencePayload::ObjectRows { embeddings: rows } => {
                rows
            }
        };
        if rows.is_empty() {
            return Err(BenchError::Shape("reference file holds no embedding".into()));
        }
        Ok(rows)
    }

    /// Vector for the local reference model; the text is only used for
    /// logging since the file already holds its embedding.
    pub fn embed_locally(&self, text: &str) -> Vec<f32> {
        tracing::debug!(chars = text.len(), "using precomputed reference embedding");
        self.rows[0].clone()
    }
}

#[async_trait]
impl EmbeddingSource for ReferenceFile {
    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Reference
    }

    /// A single stored vector answers every entry of the batch.
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        match self.rows.len() {
            1 => Ok(inputs.iter().map(|text| self.embed_locally(text)).collect()),
            n if n == inputs.len() => Ok(self.rows.clone()),
            n => Err(BenchError::Shape(format!(
                "reference file holds {n} rows for a batch of {}",
                inputs.len()
            ))),
        }
    }
}
