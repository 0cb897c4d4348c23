pub mod config;
pub mod embedder;
mod http;
pub mod openai_client;
pub mod reference;
pub mod triton_client;
