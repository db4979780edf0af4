// ai4kali-core/src/providers/mod.rs
use crate::config::{BackendConfig, BackendKind};
use crate::errors::ModelError;
use async_trait::async_trait;
use reqwest::Client;

/// A text-completion backend. One call, one prompt, raw text back.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, ModelError>;

    /// Cheap reachability check, used once at start-up.
    async fn probe(&self) -> Result<(), ModelError>;

    fn name(&self) -> &str;
}

pub fn build_provider(config: &BackendConfig) -> Box<dyn Provider> {
    match config.kind {
        BackendKind::Http => Box::new(ollama_http::OllamaHttpProvider::new(
            config.endpoint.clone(),
            config.stream,
            Client::new(),
        )),
        BackendKind::Cli => Box::new(ollama_cli::OllamaCliProvider::new(
            config.executable.clone(),
            config.args.clone(),
        )),
    }
}

pub mod ollama_cli;
pub mod ollama_http;
