use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use shared::error::BenchError;
use shared::types::Result;

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// OpenAI-style `{"error": {...}}` or the serving framework's `{"error": "..."}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    Detailed { error: ErrorDetail },
    Plain { error: String },
}

pub(crate) fn transport(err: reqwest::Error) -> BenchError {
    BenchError::request(err.status().map(|s| s.as_u16()), err.to_string())
}

/// Pass successful responses through, turn everything else into an error.
pub(crate) async fn ensure_success(response: Response, model: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status, &body, model))
}

/// Read the whole body and decode it; decoding failures are shape errors.
pub(crate) async fn parse_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let body = response.text().await.map_err(transport)?;
    serde_json::from_str(&body)
        .map_err(|e| BenchError::Shape(format!("unexpected {what} payload: {e}")))
}

pub(crate) fn classify_failure(status: StatusCode, body: &str, model: &str) -> BenchError {
    let (message, code) = match serde_json::from_str::<ErrorPayload>(body) {
        Ok(ErrorPayload::Detailed { error }) => (error.message, error.code),
        Ok(ErrorPayload::Plain { error }) => (error, None),
        Err(_) if body.trim().is_empty() => (
            status.canonical_reason().unwrap_or("no response body").to_string(),
            None,
        ),
        Err(_) => (body.trim().to_string(), None),
    };

    let model_unknown = code.as_deref() == Some("model_not_found")
        || (status == StatusCode::NOT_FOUND && message.to_lowercase().contains("model"));
    if model_unknown {
        return BenchError::Model {
            model: model.to_string(),
            message,
        };
    }
    BenchError::request(Some(status.as_u16()), message)
}
