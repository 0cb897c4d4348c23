use crate::http::{ensure_success, parse_json, transport};
use async_trait::async_trait;
use domain::models::{Endpoint, SourceKind};
use domain::source::EmbeddingSource;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::error::BenchError;
use shared::types::Result;
use std::fmt;

const TEXT_INPUT: &str = "text";
const EMBEDDING_OUTPUT: &str = "embedding";

/// Which of the serving framework's HTTP surfaces to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TritonMode {
    /// `/v2/models/{model}/generate`, JSON object with an `embedding` field.
    Generate,
    /// `/v2/models/{model}/infer`, tensor-shaped request and response.
    #[default]
    Infer,
}

impl fmt::Display for TritonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TritonMode::Generate => f.write_str("generate"),
            TritonMode::Infer => f.write_str("infer"),
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    text_input: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct InferRequest<'a> {
    inputs: Vec<InferInput<'a>>,
    outputs: Vec<RequestedOutput<'a>>,
}

#[derive(Serialize)]
struct InferInput<'a> {
    name: &'a str,
    shape: [usize; 2],
    datatype: &'a str,
    data: &'a [String],
}

#[derive(Serialize)]
struct RequestedOutput<'a> {
    name: &'a str,
}

#[derive(Deserialize)]
struct InferResponse {
    outputs: Vec<OutputTensor>,
}

#[derive(Deserialize)]
struct OutputTensor {
    name: String,
    #[serde(default)]
    datatype: String,
    shape: Vec<usize>,
    data: Vec<f32>,
}

/// Split a flat `[batch, dimensions]` FP32 tensor into one row per input.
fn tensor_rows(tensor: OutputTensor, batch_size: usize) -> Result<Vec<Vec<f32>>> {
    if !tensor.datatype.is_empty() && tensor.datatype != "FP32" {
        return Err(BenchError::Shape(format!(
            "output '{}' has datatype {}, expected FP32",
            tensor.name, tensor.datatype
        )));
    }
    let &[rows, dimensions] = tensor.shape.as_slice() else {
        return Err(BenchError::Shape(format!(
            "output '{}' has shape {:?}, expected [batch, dimensions]",
            tensor.name, tensor.shape
        )));
    };
    if rows != batch_size {
        return Err(BenchError::Shape(format!(
            "batch sizes of request and response differ: {batch_size} vs {rows}"
        )));
    }
    let expected = rows.checked_mul(dimensions).ok_or_else(|| {
        BenchError::Shape(format!(
            "output '{}' has an impossible shape {:?}",
            tensor.name, tensor.shape
        ))
    })?;
    if tensor.data.len() != expected {
        return Err(BenchError::Shape(format!(
            "output '{}' carries {} values for shape {:?}",
            tensor.name,
            tensor.data.len(),
            tensor.shape
        )));
    }
    if dimensions == 0 {
        return Ok(vec![Vec::new(); rows]);
    }
    Ok(tensor.data.chunks(dimensions).map(<[f32]>::to_vec).collect())
}

/// Embeddings from a model-serving framework speaking the KServe v2 HTTP
/// protocol.
#[derive(Clone)]
pub struct TritonClient {
    client: Client,
    endpoint: Endpoint,
    model: String,
    mode: TritonMode,
    label: String,
}

impl TritonClient {
    pub fn new(
        client: Client,
        endpoint: Endpoint,
        model: impl Into<String>,
        mode: TritonMode,
    ) -> Self {
        let model = model.into();
        let label = format!("{} ({model}, {mode})", endpoint.base_url);
        Self {
            client,
            endpoint,
            model,
            mode,
            label,
        }
    }

    fn model_url(&self, action: &str) -> String {
        self.endpoint.url(&format!("v2/models/{}/{action}", self.model))
    }

    pub async fn embed_via_generate(&self, text: &str) -> Result<Vec<f32>> {
        let url = self.model_url("generate");
        tracing::debug!(%url, "generate request");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.endpoint.api_key)
            .json(&GenerateRequest { text_input: text })
            .send()
            .await
            .map_err(transport)?;
        let response = ensure_success(response, &self.model).await?;
        let body: GenerateResponse = parse_json(response, "generate").await?;
        Ok(body.embedding)
    }

    pub async fn embed_via_tensor_rpc(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self.model_url("infer");
        let request = InferRequest {
            inputs: vec![InferInput {
                name: TEXT_INPUT,
                shape: [inputs.len(), 1],
                datatype: "BYTES",
                data: inputs,
            }],
            outputs: vec![RequestedOutput {
                name: EMBEDDING_OUTPUT,
            }],
        };
        tracing::debug!(%url, batch = inputs.len(), "infer request");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.endpoint.api_key)
            .json(&request)
            .send()
            .await
            .map_err(transport)?;
        let response = ensure_success(response, &self.model).await?;
        let body: InferResponse = parse_json(response, "infer").await?;
        let tensor = body
            .outputs
            .into_iter()
            .find(|o| o.name == EMBEDDING_OUTPUT)
            .ok_or_else(|| BenchError::Shape(format!("no '{EMBEDDING_OUTPUT}' output tensor")))?;
        tensor_rows(tensor, inputs.len())
    }
}

#[async_trait]
impl EmbeddingSource for TritonClient {
    fn label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Triton
    }

    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        match self.mode {
            TritonMode::Infer => self.embed_via_tensor_rpc(inputs).await,
            TritonMode::Generate => {
                // generate takes one text per call
                let mut rows = Vec::with_capacity(inputs.len());
                for input in inputs {
                    rows.push(self.embed_via_generate(input).await?);
                }
                Ok(rows)
            }
        }
    }
}
