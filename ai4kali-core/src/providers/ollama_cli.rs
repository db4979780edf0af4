// ai4kali-core/src/providers/ollama_cli.rs
use super::Provider;
use crate::config::MODEL_PLACEHOLDER;
use crate::errors::ModelError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs a local executable (by default `ollama run <model>`) with the prompt on stdin.
///
/// The child is spawned with `kill_on_drop`, so dropping the future on
/// timeout or cancellation also terminates the process.
#[derive(Clone, Debug)]
pub struct OllamaCliProvider {
    executable: String,
    args: Vec<String>,
}

impl OllamaCliProvider {
    pub fn new(executable: String, args: Vec<String>) -> Self {
        debug!("Creating CLI provider: {} {:?}", executable, args);
        Self { executable, args }
    }

    fn args_for(&self, model: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.replace(MODEL_PLACEHOLDER, model))
            .collect()
    }

    fn map_spawn_error(&self, e: std::io::Error) -> ModelError {
        if e.kind() == ErrorKind::NotFound {
            ModelError::NotFound(format!("'{}' is not installed or not on PATH", self.executable))
        } else {
            ModelError::Backend(format!("failed to start '{}': {}", self.executable, e))
        }
    }
}

#[async_trait]
impl Provider for OllamaCliProvider {
    fn name(&self) -> &str {
        &self.executable
    }

    async fn generate(&self, prompt: &str, model: &str) -> Result<String, ModelError> {
        let args = self.args_for(model);
        debug!(executable = %self.executable, ?args, "Spawning model process");

        let mut child = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.map_spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A child that exits without reading stdin closes the pipe; its exit status tells the story.
            if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                warn!(error = %e, "Failed to write prompt to model process stdin");
            }
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ModelError::Backend(format!("failed to wait for '{}': {}", self.executable, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ModelError::Backend(format!(
                "'{}' exited with {}: {}",
                self.executable,
                output.status,
                if stderr.is_empty() { "<no stderr>" } else { &stderr }
            )));
        }

        let stdout = String::from_utf8(output.stdout).map_err(|e| ModelError::Decode(e.to_string()))?;
        debug!(chars = stdout.len(), "Model process finished");
        Ok(stdout)
    }

    async fn probe(&self) -> Result<(), ModelError> {
        let status = Command::new(&self.executable)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| self.map_spawn_error(e))?;
        debug!(executable = %self.executable, %status, "Probed model executable");
        Ok(())
    }
}
