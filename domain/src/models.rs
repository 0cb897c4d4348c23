use serde::{Deserialize, Serialize};

/// Where an embedding came from. Decides which comparison policy applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// OpenAI-compatible `/embeddings` endpoint.
    OpenAi,
    /// Model-serving framework (generate or tensor inference endpoint).
    Triton,
    /// Vector produced by a locally run reference model.
    Reference,
}

impl SourceKind {
    pub fn is_api_compatible(self) -> bool {
        matches!(self, SourceKind::OpenAi)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub source: String,
    pub kind: SourceKind,
    pub vector: Vec<f32>,
}

impl Embedding {
    pub fn new(source: impl Into<String>, kind: SourceKind, vector: Vec<f32>) -> Self {
        Self {
            source: source.into(),
            kind,
            vector,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }
}

/// One inference-serving target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub base_url: String,
    pub api_key: String,
}

impl Endpoint {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

/// Serialized as-is into the `/chat/completions` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, max_tokens: u32, stream: bool) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            max_tokens,
            stream,
        }
    }

    pub fn with_message(mut self, role: Role, content: impl Into<String>) -> Self {
        self.messages.push(Message {
            role,
            content: content.into(),
        });
        self
    }
}
