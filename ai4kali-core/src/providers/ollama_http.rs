// ai4kali-core/src/providers/ollama_http.rs
use super::Provider;
use crate::errors::ModelError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

/// One line of an `/api/generate` response.
#[derive(Deserialize, Debug)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct OllamaHttpProvider {
    endpoint: String,
    stream: bool,
    http_client: Client,
}

impl OllamaHttpProvider {
    pub fn new(endpoint: String, stream: bool, http_client: Client) -> Self {
        debug!("Creating Ollama HTTP provider for endpoint: {}", endpoint);
        Self {
            endpoint,
            stream,
            http_client,
        }
    }

    fn build_payload(&self, prompt: &str, model: &str) -> Value {
        json!({
            "model": model,
            "prompt": prompt,
            "stream": self.stream,
        })
    }

    /// `http://host:port/api/generate` -> `http://host:port/api/version`
    fn version_url(&self) -> Result<Url, ModelError> {
        let url = Url::parse(&self.endpoint)
            .map_err(|e| ModelError::Backend(format!("invalid endpoint '{}': {}", self.endpoint, e)))?;
        url.join("/api/version")
            .map_err(|e| ModelError::Backend(format!("invalid endpoint '{}': {}", self.endpoint, e)))
    }
}

fn map_send_error(e: reqwest::Error) -> ModelError {
    if e.is_connect() {
        ModelError::NotFound(e.to_string())
    } else {
        ModelError::Backend(e.to_string())
    }
}

/// Concatenates the `response` fields of a line-delimited JSON body.
///
/// A non-streamed body is a single JSON object and goes through the same path.
pub(crate) fn collect_chunks(body: &[u8]) -> Result<String, ModelError> {
    let mut text = String::new();
    for raw_line in body.split(|b| *b == b'\n') {
        let line = std::str::from_utf8(raw_line).map_err(|e| ModelError::Decode(e.to_string()))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let chunk: GenerateChunk = serde_json::from_str(line)
            .map_err(|e| ModelError::Backend(format!("malformed response chunk ({}): {}", e, line)))?;
        if let Some(error) = chunk.error {
            return Err(ModelError::Backend(error));
        }
        text.push_str(&chunk.response);
        if chunk.done {
            break;
        }
    }
    Ok(text)
}

#[async_trait]
impl Provider for OllamaHttpProvider {
    fn name(&self) -> &str {
        "ollama-http"
    }

    async fn generate(&self, prompt: &str, model: &str) -> Result<String, ModelError> {
        let payload = self.build_payload(prompt, model);
        debug!(endpoint = %self.endpoint, model, stream = self.stream, "Sending request to Ollama API...");

        let mut response = self
            .http_client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        debug!("Received response from Ollama API, status: {}", status);

        let mut body = Vec::new();
        while let Some(bytes) = response
            .chunk()
            .await
            .map_err(|e| ModelError::Backend(format!("failed to read response body: {}", e)))?
        {
            body.extend_from_slice(&bytes);
        }

        if !status.is_success() {
            return Err(ModelError::Backend(format!(
                "API call failed with status {}: {}",
                status,
                String::from_utf8_lossy(&body).trim()
            )));
        }

        let text = collect_chunks(&body)?;
        debug!(chars = text.len(), "Collected model response");
        Ok(text)
    }

    async fn probe(&self) -> Result<(), ModelError> {
        let url = self.version_url()?;
        debug!(%url, "Probing Ollama API");
        let response = self.http_client.get(url).send().await.map_err(map_send_error)?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ModelError::Backend(format!("probe returned status {}", response.status())))
        }
    }
}
