// ai4kali-cli/src/main.rs
mod config;
mod interaction;
mod models;
mod rendering;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use colored::*;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use time::macros::format_description;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{
    fmt::{self, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use ai4kali_core::{
    providers::build_provider, AbortReason, Assistant, CancellationToken, Config, GateState,
    ModelClient, ModelError, Request, ShellRunner, TurnOptions, TurnReport,
};

use crate::interaction::CliUserInteraction;
use crate::models::cli::Cli;

const APP_DIR: &str = "ai4kali";
const LOG_FILE_NAME: &str = "ai4kali.log";
const HISTORY_FILE_NAME: &str = "history.txt";

type CliAssistant = Assistant<CliUserInteraction>;

fn app_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir()
        .or_else(dirs::runtime_dir)
        .or_else(|| Some(std::env::temp_dir()))
        .map(|d| d.join(APP_DIR))
}

fn print_welcome_message(config: &Config, backend: &str) {
    println!("\n{}", "ai4kali - natural language to shell".cyan().bold());
    println!("{}: {} via {}", "Model".cyan(), config.model, backend);
    println!(
        "{}",
        "Type 'exit', 'quit', Ctrl-D, or press Enter on an empty line to quit.".dimmed()
    );
    println!();
}

/// Tells the user how a turn ended, beyond what the gate already printed.
fn print_turn_summary(report: &TurnReport) {
    match report.state() {
        GateState::Executed(0) => {}
        GateState::Executed(code) => {
            eprintln!("{} {}", "Command exited with status".yellow(), code);
        }
        GateState::Aborted(AbortReason::UserCancelled) => println!("{}", "Cancelled.".dimmed()),
        GateState::Aborted(AbortReason::ModelError) | GateState::Aborted(AbortReason::DecodeError) => {
            eprintln!(
                "{} {}",
                "Model request failed:".red().bold(),
                report.detail.as_deref().unwrap_or("unknown error")
            );
        }
        GateState::Aborted(AbortReason::ModelEmpty) => {
            eprintln!("{}", "Model returned no usable command.".red());
        }
        _ => {}
    }
}

/// Runs one request with Ctrl-C wired to its cancellation token.
async fn run_request(
    assistant: &CliAssistant,
    ui_handler: &CliUserInteraction,
    config: &Config,
    text: &str,
    options: TurnOptions,
) -> Result<TurnReport> {
    let request = Request::new(text, config);
    let cancel = CancellationToken::new();

    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    ui_handler.start_spinner("Thinking...");
    let result = assistant.run_turn(&request, options, &cancel).await;
    ui_handler.stop_spinner();
    watcher.abort();

    let report = result?;
    info!(turn_id = %report.turn_id, outcome = ?report.outcome(), "Turn finished");
    print_turn_summary(&report);
    Ok(report)
}

async fn run_single_turn(
    assistant: &CliAssistant,
    ui_handler: &CliUserInteraction,
    config: &Config,
    query: &str,
    options: TurnOptions,
) -> Result<i32> {
    let report = run_request(assistant, ui_handler, config, query, options).await?;
    Ok(report.exit_code())
}

async fn run_interactive(
    assistant: &CliAssistant,
    ui_handler: &CliUserInteraction,
    config: &Config,
    options: TurnOptions,
) -> Result<()> {
    print_welcome_message(config, assistant.client().provider_name());

    let mut rl = DefaultEditor::new()?;

    let history_dir =
        app_cache_dir().ok_or_else(|| anyhow!("Could not determine cache directory for history file"))?;
    fs::create_dir_all(&history_dir).context("Failed to create history directory")?;
    let history_file_path = history_dir.join(HISTORY_FILE_NAME);
    if rl.load_history(&history_file_path).is_err() {
        debug!(path = %history_file_path.display(), "No previous history found or error loading.");
    }

    let prompt = format!("{} ", "ai4kali>".green().bold());

    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed_input = line.trim();
                let lowered = trimmed_input.to_lowercase();
                if trimmed_input.is_empty() || lowered == "exit" || lowered == "quit" {
                    info!("Exit command or empty line entered, exiting interactive mode.");
                    break;
                }
                if let Err(e) = rl.add_history_entry(trimmed_input) {
                    debug!("Failed to add history entry: {}", e);
                }

                if let Err(e) = run_request(assistant, ui_handler, config, trimmed_input, options).await {
                    error!("Turn failed: {:#}", e);
                    eprintln!("\n{}: {:#}", "Error".red(), e);
                }
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => {
                info!("EOF detected, exiting interactive mode.");
                break;
            }
            Err(err) => {
                error!("Readline error: {:?}", err);
                eprintln!("Error reading input: {}", err.to_string().red());
                break;
            }
        }
    }

    if let Err(e) = rl.save_history(&history_file_path) {
        warn!(path = %history_file_path.display(), error = %e, "Failed to save history.");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    colored::control::set_override(true);
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // --- Logging Setup ---
    let default_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(default_level.into()));

    let Some(log_dir) = app_cache_dir() else {
        eprintln!("{}", "Error: Could not determine a suitable directory for log files.".red());
        return ExitCode::FAILURE;
    };
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("{} Failed to create log directory {}: {}", "Error:".red(), log_dir.display(), e);
        return ExitCode::FAILURE;
    }

    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(file_appender);
    let local_timer = LocalTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    ));

    let file_layer = fmt::layer()
        .with_writer(non_blocking_writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_timer(local_timer.clone());
    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(local_timer)
        .with_target(false)
        .with_level(true);

    if let Err(e) = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("{} Failed to initialize logging: {}", "Error:".red(), e);
        return ExitCode::FAILURE;
    }
    colored::control::unset_override();
    info!(
        "Logging initialized (default: {}). Logging to stderr and {}",
        default_level,
        log_dir.join(LOG_FILE_NAME).display()
    );

    // --- Config ---
    let config = match config::load_config(&cli) {
        Ok((config, path)) => {
            debug!(?path, ?config, "Configuration loaded");
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            eprintln!("{} {:#}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };

    let client = ModelClient::new(build_provider(&config.backend));
    match client.probe().await {
        Ok(()) => debug!(backend = client.provider_name(), "Backend probe succeeded"),
        Err(ModelError::NotFound(detail)) => {
            error!("Backend unavailable: {}", detail);
            eprintln!(
                "{} {}\n{}",
                "Error: model backend not available:".red().bold(),
                detail,
                "Is Ollama installed and running?".dimmed()
            );
            return ExitCode::FAILURE;
        }
        Err(e) => warn!("Backend probe failed, continuing anyway: {}", e),
    }

    let runner = match std::env::current_dir() {
        Ok(dir) => ShellRunner::with_working_dir(dir),
        Err(e) => {
            warn!("Failed to get current directory, commands inherit it from the process: {}", e);
            ShellRunner::new()
        }
    };
    let ui_handler = Arc::new(CliUserInteraction::new());
    let assistant = match Assistant::new(&config, client, Arc::clone(&ui_handler), Box::new(runner)) {
        Ok(assistant) => assistant,
        Err(e) => {
            error!("Failed to set up assistant: {:#}", e);
            eprintln!("{} {:#}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };

    let options = TurnOptions {
        dry_run: cli.dry_run,
        auto_confirm: cli.yes,
        explain: cli.explain,
    };

    match cli.query_text() {
        Some(query) => match run_single_turn(&assistant, &ui_handler, &config, &query, options).await {
            Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
            Err(e) => {
                error!("Turn failed: {:#}", e);
                eprintln!("{} {:#}", "Error:".red(), e);
                ExitCode::FAILURE
            }
        },
        None => match run_interactive(&assistant, &ui_handler, &config, options).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Interactive session failed: {:#}", e);
                eprintln!("{} {:#}", "Error:".red(), e);
                ExitCode::FAILURE
            }
        },
    }
}
