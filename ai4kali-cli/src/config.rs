// ai4kali-cli/src/config.rs

//! Config discovery and layering: file, then environment, then flags.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use ai4kali_core::Config;

use crate::models::cli::Cli;

pub const CONFIG_FILENAME: &str = "ai4kali.toml";

pub const ENV_MODEL: &str = "AI4KALI_MODEL";
pub const ENV_TIMEOUT: &str = "AI4KALI_TIMEOUT";
pub const ENV_ENDPOINT: &str = "AI4KALI_ENDPOINT";

/// Looks for `ai4kali.toml` in `start` and each of its parents.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let candidate = dir.join(CONFIG_FILENAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        current = dir.parent();
    }
    None
}

fn user_config_file() -> Option<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join("ai4kali").join("config.toml"))
        .filter(|p| p.is_file())
}

/// Reads the config file, if any. Returns the defaults when none is found.
pub fn load_file_config(explicit: Option<&Path>, cwd: &Path) -> Result<(Config, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(anyhow!("Config file not found: {}", path.display()));
            }
            Some(path.to_path_buf())
        }
        None => find_config_file(cwd).or_else(user_config_file),
    };

    match path {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let config = Config::from_toml_str(&content)
                .with_context(|| format!("Invalid config file: {:?}", path))?;
            info!("Loaded configuration from {:?}", path);
            Ok((config, Some(path)))
        }
        None => {
            debug!("No config file found, using defaults.");
            Ok((Config::default(), None))
        }
    }
}

/// Applies `AI4KALI_*` variables. `lookup` is `std::env::var(..).ok()` outside tests.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
    if let Some(model) = lookup(ENV_MODEL) {
        config.model = model;
    }
    if let Some(timeout) = lookup(ENV_TIMEOUT) {
        config.timeout_secs = timeout
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number of seconds, got '{}'", ENV_TIMEOUT, timeout))?;
    }
    if let Some(endpoint) = lookup(ENV_ENDPOINT) {
        config.backend.endpoint = endpoint;
    }
    Ok(())
}

pub fn apply_cli_overrides(config: &mut Config, cli: &Cli) {
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(backend) = cli.backend {
        config.backend.kind = backend.into();
    }
    if let Some(endpoint) = &cli.endpoint {
        config.backend.endpoint = endpoint.clone();
    }
}

/// File, environment and flags, validated once at the end.
pub fn load_config(cli: &Cli) -> Result<(Config, Option<PathBuf>)> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let (mut config, path) = load_file_config(cli.config.as_deref(), &cwd)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    apply_cli_overrides(&mut config, cli);
    config
        .validate()
        .context("Configuration is invalid after applying environment and command-line overrides")?;
    Ok((config, path))
}
