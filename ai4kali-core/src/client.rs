// ai4kali-core/src/client.rs

//! Bounded, cancellable model invocation on top of a [`Provider`].

use crate::errors::ModelError;
use crate::prompt::build_explain_prompt;
use crate::providers::Provider;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct ModelClient {
    provider: Box<dyn Provider>,
}

impl ModelClient {
    pub fn new(provider: Box<dyn Provider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Sends `prompt` once. Never retries.
    ///
    /// Returns [`ModelError::Timeout`] once `timeout` elapses and
    /// [`ModelError::Cancelled`] as soon as `cancel` fires; in both cases the
    /// in-flight provider future is dropped.
    pub async fn complete(
        &self,
        prompt: &str,
        model_id: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<String, ModelError> {
        debug!(provider = self.provider.name(), model = model_id, ?timeout, "Requesting completion");

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ModelError::Cancelled),
            outcome = tokio::time::timeout(timeout, self.provider.generate(prompt, model_id)) => {
                match outcome {
                    Ok(result) => result,
                    Err(_) => Err(ModelError::Timeout(timeout)),
                }
            }
        };

        if let Err(e) = &result {
            warn!(model = model_id, error = %e, "Completion failed");
        }
        result
    }

    /// Asks the model to describe `command`. Presentation only.
    pub async fn explain(
        &self,
        command: &str,
        model_id: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<String, ModelError> {
        let prompt = build_explain_prompt(command);
        self.complete(&prompt, model_id, timeout, cancel)
            .await
            .map(|text| text.trim().to_string())
    }

    pub async fn probe(&self) -> Result<(), ModelError> {
        self.provider.probe().await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    /// Provider returning canned answers in order, optionally after a delay.
    #[derive(Clone)]
    pub(crate) struct ScriptedProvider {
        pub(crate) answers: Arc<Mutex<Vec<Result<String, ModelError>>>>,
        pub(crate) prompts: Arc<Mutex<Vec<String>>>,
        pub(crate) delay: Option<Duration>,
    }

    impl ScriptedProvider {
        pub(crate) fn new(answers: Vec<Result<String, ModelError>>) -> Self {
            Self {
                answers: Arc::new(Mutex::new(answers)),
                prompts: Arc::new(Mutex::new(Vec::new())),
                delay: None,
            }
        }

        pub(crate) fn slow(delay: Duration) -> Self {
            let mut provider = Self::new(vec![Ok("ls".to_string())]);
            provider.delay = Some(delay);
            provider
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        async fn generate(&self, prompt: &str, _model: &str) -> Result<String, ModelError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let mut answers = self.answers.lock().unwrap();
            if answers.is_empty() {
                return Err(ModelError::Backend("ScriptedProvider: no answer left".to_string()));
            }
            answers.remove(0)
        }

        async fn probe(&self) -> Result<(), ModelError> {
            Ok(())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn test_complete_passes_through_success() {
        let client = ModelClient::new(Box::new(ScriptedProvider::new(vec![Ok("nmap -sV 10.0.0.1".to_string())])));
        let out = client
            .complete("p", "m", Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out, "nmap -sV 10.0.0.1");
    }

    #[tokio::test]
    async fn test_complete_does_not_retry() {
        let provider = ScriptedProvider::new(vec![
            Err(ModelError::Backend("boom".to_string())),
            Ok("ls".to_string()),
        ]);
        let prompts = provider.prompts.clone();
        let client = ModelClient::new(Box::new(provider));
        let result = client
            .complete("p", "m", Duration::from_secs(5), &CancellationToken::new())
            .await;
        assert_eq!(result, Err(ModelError::Backend("boom".to_string())));
        assert_eq!(prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_complete_times_out() {
        let client = ModelClient::new(Box::new(ScriptedProvider::slow(Duration::from_secs(30))));
        let timeout = Duration::from_millis(50);
        let started = Instant::now();
        let result = client.complete("p", "m", timeout, &CancellationToken::new()).await;
        assert_eq!(result, Err(ModelError::Timeout(timeout)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_complete_cancelled() {
        let client = ModelClient::new(Box::new(ScriptedProvider::slow(Duration::from_secs(30))));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let result = client.complete("p", "m", Duration::from_secs(60), &cancel).await;
        assert_eq!(result, Err(ModelError::Cancelled));
    }

    #[tokio::test]
    async fn test_explain_uses_explain_prompt() {
        let provider = ScriptedProvider::new(vec![Ok("  Scans service versions.\n".to_string())]);
        let prompts = provider.prompts.clone();
        let client = ModelClient::new(Box::new(provider));
        let text = client
            .explain("nmap -sV 10.0.0.1", "m", Duration::from_secs(5), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "Scans service versions.");
        assert_eq!(prompts.lock().unwrap()[0], build_explain_prompt("nmap -sV 10.0.0.1"));
    }

    #[tokio::test]
    async fn test_cli_provider_timeout_kills_child() {
        use crate::providers::ollama_cli::OllamaCliProvider;
        let provider = OllamaCliProvider::new("sh".to_string(), vec!["-c".to_string(), "sleep 30".to_string()]);
        let client = ModelClient::new(Box::new(provider));
        let started = Instant::now();
        let result = client
            .complete("p", "m", Duration::from_millis(200), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ModelError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
