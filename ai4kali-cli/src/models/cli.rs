use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

use ai4kali_core::BackendKind;

/// ai4kali: turn a plain-language request into one shell command.
/// Runs a single request when QUERY is given, otherwise starts an interactive session.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase message verbosity.
    ///
    /// Specify multiple times for more verbose output:
    ///  -v:  INFO level
    ///  -vv: DEBUG level
    ///  -vvv: TRACE level (most verbose)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Model name passed to the backend (overrides config).
    #[arg(short, long)]
    pub model: Option<String>,

    /// Seconds to wait for the model before giving up.
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Show the generated command but never run it.
    #[arg(long = "dry", visible_alias = "dry-run")]
    pub dry_run: bool,

    /// Run known-tool commands without asking.
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,

    /// Ask the model to explain the command before confirmation.
    #[arg(short, long)]
    pub explain: bool,

    /// How to reach the model.
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Generate endpoint for the http backend.
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Path to a config file (default: ai4kali.toml in this or a parent directory).
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Natural language request.
    pub query: Vec<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendArg {
    Http,
    Cli,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Http => BackendKind::Http,
            BackendArg::Cli => BackendKind::Cli,
        }
    }
}

impl Cli {
    /// The joined query, or `None` for interactive mode.
    pub fn query_text(&self) -> Option<String> {
        let text = self.query.join(" ").trim().to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_one_shot_flags() {
        let cli = Cli::try_parse_from([
            "ai4kali", "-y", "--dry", "-e", "-m", "qwen2.5", "-t", "5", "scan", "ports", "on", "10.0.0.1",
        ])
        .unwrap();
        assert!(cli.yes);
        assert!(cli.dry_run);
        assert!(cli.explain);
        assert_eq!(cli.model.as_deref(), Some("qwen2.5"));
        assert_eq!(cli.timeout, Some(5));
        assert_eq!(cli.query_text().as_deref(), Some("scan ports on 10.0.0.1"));
    }

    #[test]
    fn test_dry_run_alias() {
        let cli = Cli::try_parse_from(["ai4kali", "--dry-run", "list files"]).unwrap();
        assert!(cli.dry_run);
    }

    #[test]
    fn test_no_query_means_interactive() {
        let cli = Cli::try_parse_from(["ai4kali", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.query_text().is_none());
    }

    #[test]
    fn test_backend_flag() {
        let cli = Cli::try_parse_from(["ai4kali", "--backend", "http", "--endpoint", "http://box:11434/api/generate", "ls"])
            .unwrap();
        assert_eq!(cli.backend.map(BackendKind::from), Some(BackendKind::Http));
        assert_eq!(cli.endpoint.as_deref(), Some("http://box:11434/api/generate"));
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        assert!(Cli::try_parse_from(["ai4kali", "-t", "soon", "ls"]).is_err());
    }
}
