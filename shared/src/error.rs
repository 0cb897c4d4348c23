use std::io;
use thiserror::Error;

/// Errors surfaced while probing an inference endpoint.
///
/// Every variant is fatal to the invocation: nothing is retried and partial
/// results are dropped.
#[derive(Debug, Error)]
pub enum BenchError {
    /// Transport failure or a non-success HTTP status.
    #[error("request failed{}: {message}", status_suffix(.status))]
    Request {
        status: Option<u16>,
        message: String,
    },
    /// The endpoint does not know the requested model.
    #[error("model '{model}' is not served by the endpoint: {message}")]
    Model { model: String, message: String },
    /// Two embedding vectors of different length were compared.
    #[error("embedding dimensions differ: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
    /// The response payload is missing fields or has an unexpected shape.
    #[error("malformed response: {0}")]
    Shape(String),
    /// Illegal transition of the streaming state machine.
    #[error("invalid stream transition from {from} to {to}")]
    State {
        from: &'static str,
        to: &'static str,
    },
    /// Inconsistent command-line settings.
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status
        .map(|code| format!(" with status {code}"))
        .unwrap_or_default()
}

impl BenchError {
    pub fn request(status: Option<u16>, message: impl Into<String>) -> Self {
        BenchError::Request {
            status,
            message: message.into(),
        }
    }

    /// HTTP status carried by a request failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            BenchError::Request { status, .. } => *status,
            _ => None,
        }
    }
}
