// ai4kali-core/src/config.rs

//! Configuration structures and parsing.
//!
//! A [`Config`] is built once at start-up and handed by reference to every
//! component; nothing reads settings from globals.

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const DEFAULT_MODEL: &str = "llama3.2";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:11434/api/generate";
pub const DEFAULT_EXECUTABLE: &str = "ollama";

/// Placeholder replaced by the model name in [`BackendConfig::args`].
pub const MODEL_PLACEHOLDER: &str = "{model}";

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub model: String,
    pub timeout_secs: u64,
    pub backend: BackendConfig,
    pub safety: SafetyConfig,
}

/// Which transport reaches the model.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// `POST /api/generate`, line-delimited JSON chunks.
    Http,
    /// A local executable reading the prompt on stdin.
    Cli,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BackendConfig {
    #[serde(rename = "type")]
    pub kind: BackendKind,
    pub endpoint: String,
    pub stream: bool,
    pub executable: String,
    pub args: Vec<String>,
}

/// What to do with a command whose first token is not a known tool.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShapePolicy {
    /// Show a warning and require an explicit interactive confirmation.
    Warn,
    /// Never execute it.
    Block,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SafetyConfig {
    pub shape_policy: ShapePolicy,
    /// Additional deny-list regexes, matched case-insensitively.
    pub extra_dangerous_patterns: Vec<String>,
    /// Additional first-token names treated as known tools.
    pub extra_known_tools: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            backend: BackendConfig::default(),
            safety: SafetyConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Cli,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            stream: true,
            executable: DEFAULT_EXECUTABLE.to_string(),
            args: vec!["run".to_string(), MODEL_PLACEHOLDER.to_string()],
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            shape_policy: ShapePolicy::Warn,
            extra_dangerous_patterns: Vec::new(),
            extra_known_tools: Vec::new(),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn from_toml_str(config_toml_content: &str) -> Result<Config> {
        let config: Config = match toml::from_str(config_toml_content) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::error!(error = %e, "Failed to parse TOML content");
                return Err(anyhow!(e))
                    .context("Failed to parse configuration TOML content. Check TOML syntax.");
            }
        };
        config.validate()?;
        tracing::info!("Successfully parsed and validated configuration.");
        Ok(config)
    }

    /// Checks invariants that serde cannot express. Also run after CLI/env overrides.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("'model' must not be empty."));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("'timeout_secs' must be greater than zero."));
        }

        match self.backend.kind {
            BackendKind::Http => {
                if self.backend.endpoint.trim().is_empty() {
                    return Err(anyhow!("'backend.endpoint' must not be empty for the http backend."));
                }
                Url::parse(&self.backend.endpoint).with_context(|| {
                    format!("Invalid URL format for 'backend.endpoint' ('{}').", self.backend.endpoint)
                })?;
            }
            BackendKind::Cli => {
                if self.backend.executable.trim().is_empty() {
                    return Err(anyhow!("'backend.executable' must not be empty for the cli backend."));
                }
            }
        }

        for pattern in &self.safety.extra_dangerous_patterns {
            Regex::new(pattern).with_context(|| {
                format!("Invalid regex in 'safety.extra_dangerous_patterns': '{}'", pattern)
            })?;
        }
        if self.safety.extra_known_tools.iter().any(|t| t.trim().is_empty()) {
            return Err(anyhow!("'safety.extra_known_tools' contains an empty entry."));
        }
        Ok(())
    }
}
