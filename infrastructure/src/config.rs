use crate::http::transport;
use reqwest::Client;
use shared::types::Result;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_URL: &str = "http://localhost:3000/v1";
pub const DEFAULT_API_KEY: &str = "test";
pub const DEFAULT_EMBEDDING_MODEL: &str = "BAAI/bge-large-en-v1.5";
pub const DEFAULT_CHAT_MODEL: &str = "Mistral-7B-Instruct-v0.2";

pub const ENV_URL: &str = "INFER_BENCH_URL";
pub const ENV_COMPARE_URL: &str = "INFER_BENCH_COMPARE_URL";
pub const ENV_API_KEY: &str = "INFER_BENCH_API_KEY";

/// Load a `.env` file, if any, so its variables can default CLI flags.
pub fn load_env() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

/// HTTP client settings shared by every endpoint of one invocation.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// `None` keeps reqwest's default, which never times out.
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn build_client(&self) -> Result<Client> {
        let mut builder = Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().map_err(transport)
    }
}
