// ai4kali-cli/src/interaction.rs
use anyhow::{Context, Result};
use colored::*;
use dialoguer::{theme::ColorfulTheme, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::io::{self, BufRead, ErrorKind, IsTerminal, Write};
use std::pin::{pin, Pin};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use ai4kali_core::{async_trait, Classification, Confirmation, Notice, UserInteraction};

use crate::rendering::{highlight_command, print_explanation};

const CHOICES: &[&str] = &["Run it", "Edit first", "Cancel"];

/// Blocking source of answer lines for the plain prompt. `Ok(None)` is end of input.
pub trait LineSource: Send + Sync {
    fn read_line(&self) -> io::Result<Option<String>>;
}

struct StdinLines;

impl LineSource for StdinLines {
    fn read_line(&self) -> io::Result<Option<String>> {
        let mut buffer = String::new();
        match io::stdin().lock().read_line(&mut buffer)? {
            0 => Ok(None),
            _ => Ok(Some(buffer)),
        }
    }
}

/// Terminal front-end for the execution gate.
pub struct CliUserInteraction {
    spinner: Mutex<Option<ProgressBar>>,
    lines: Arc<dyn LineSource>,
    use_terminal: bool,
}

impl CliUserInteraction {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
            lines: Arc::new(StdinLines),
            use_terminal: io::stdin().is_terminal() && io::stderr().is_terminal(),
        }
    }

    /// Always uses the plain prompt, reading answers from `lines`.
    pub fn with_lines(lines: Arc<dyn LineSource>) -> Self {
        Self {
            spinner: Mutex::new(None),
            lines,
            use_terminal: false,
        }
    }

    /// Shows a spinner until the next thing is printed.
    pub fn start_spinner(&self, message: &str) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "-"]));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(old) = slot.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    pub fn stop_spinner(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(pb) = slot.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn confirm_on_terminal(&self, command: &str) -> Result<Confirmation> {
        let theme = ColorfulTheme::default();
        let choice = Select::with_theme(&theme)
            .with_prompt("Run this command?")
            .items(CHOICES)
            .default(0)
            .interact_opt();

        match choice {
            Ok(Some(0)) => Ok(Confirmation::Yes),
            Ok(Some(1)) => {
                let edited = Input::<String>::with_theme(&theme)
                    .with_prompt("Command")
                    .with_initial_text(command)
                    .interact_text();
                match edited {
                    Ok(text) => Ok(Confirmation::Edited(text)),
                    Err(dialoguer::Error::IO(e)) if is_cancel(&e) => Ok(Confirmation::Cancelled),
                    Err(e) => Err(e).context("Failed to read edited command"),
                }
            }
            Ok(Some(_)) => Ok(Confirmation::No),
            Ok(None) => Ok(Confirmation::Cancelled),
            Err(dialoguer::Error::IO(e)) if is_cancel(&e) => Ok(Confirmation::Cancelled),
            Err(e) => Err(e).context("Failed to read confirmation"),
        }
    }

    /// Line-based fallback for pipes and dumb terminals.
    ///
    /// Resolves to `Cancelled` as soon as `interrupt` completes, even while a
    /// read is still blocked.
    async fn confirm_on_lines<I: Future>(&self, interrupt: I) -> Result<Confirmation> {
        let mut interrupt = pin!(interrupt);

        print!("{} {} ", "Run this command?".yellow(), "(y/N/e):".yellow().bold());
        io::stdout().flush().context("Failed to flush stdout")?;
        let Some(answer) = self.next_line(interrupt.as_mut()).await? else {
            return Ok(Confirmation::Cancelled);
        };

        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => Ok(Confirmation::Yes),
            "e" | "edit" => {
                print!("{} ", "Command:".yellow());
                io::stdout().flush().context("Failed to flush stdout")?;
                match self.next_line(interrupt.as_mut()).await? {
                    Some(edited) => Ok(Confirmation::Edited(edited.trim().to_string())),
                    None => Ok(Confirmation::Cancelled),
                }
            }
            _ => Ok(Confirmation::No),
        }
    }

    /// `None` on end of input or interrupt.
    async fn next_line<I: Future>(&self, interrupt: Pin<&mut I>) -> Result<Option<String>> {
        let lines = Arc::clone(&self.lines);
        let reader = tokio::task::spawn_blocking(move || lines.read_line());

        tokio::select! {
            _ = interrupt => {
                debug!("Interrupted while waiting for an answer");
                Ok(None)
            }
            joined = reader => match joined.context("Answer reader task failed")? {
                Ok(line) => Ok(line),
                Err(e) if is_cancel(&e) => Ok(None),
                Err(e) => Err(e).context("Failed to read line from stdin"),
            },
        }
    }
}

fn is_cancel(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::Interrupted | ErrorKind::UnexpectedEof)
}

/// Completes on Ctrl-C. Never completes if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[async_trait]
impl UserInteraction for CliUserInteraction {
    fn show_command(&self, command: &str, classification: &Classification) {
        self.stop_spinner();
        println!("\n{}\n", "Generated Command:".cyan().bold());
        if classification.is_dangerous {
            println!("  {}", command.red().bold());
        } else {
            println!("  {}", highlight_command(command));
        }
        println!();
    }

    fn show_explanation(&self, explanation: &str) {
        self.stop_spinner();
        println!("{}", "Explanation:".cyan().bold());
        print_explanation(explanation);
        println!();
    }

    fn show_notice(&self, notice: &Notice) {
        self.stop_spinner();
        match notice {
            Notice::Dangerous { pattern } => {
                eprintln!(
                    "{} {}",
                    "Command flagged as dangerous and will not be run:".red().bold(),
                    pattern.red()
                );
            }
            Notice::UnrecognizedTool => {
                eprintln!(
                    "{}",
                    "Warning: this does not look like a known tool. Check it carefully before running."
                        .yellow()
                );
            }
            Notice::UnrecognizedToolBlocked => {
                eprintln!(
                    "{}",
                    "Output does not resemble a known command; execution is blocked by policy.".red()
                );
            }
            Notice::AutoConfirmIgnored => {
                eprintln!("{}", "--yes does not apply to unrecognized commands.".yellow());
            }
            Notice::ExplainFailed(e) => {
                warn!("Explanation failed: {}", e);
                eprintln!("{} {}", "Could not explain the command:".yellow(), e);
            }
            Notice::DryRun => println!("{}", "(dry-run mode)".dimmed()),
            Notice::ModelDeclined => {
                println!("{}", "Request was unclear or unsafe. No command generated.".yellow());
            }
        }
    }

    async fn confirm(&self, command: &str) -> Result<Confirmation> {
        self.stop_spinner();
        let answer = if self.use_terminal {
            self.confirm_on_terminal(command)?
        } else {
            self.confirm_on_lines(interrupted()).await?
        };
        debug!(?answer, "User answered confirmation");
        Ok(answer)
    }
}
