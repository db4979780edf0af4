// ai4kali-core/src/exec.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::ExitStatus;
use tracing::{debug, info, warn};

/// Runs a confirmed command and reports its exit code.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> Result<i32>;
}

/// Executes through `sh -c` with inherited stdio.
///
/// Output is not captured; the child talks to the terminal directly.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner {
    working_dir: Option<PathBuf>,
}

impl ShellRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_working_dir(working_dir: PathBuf) -> Self {
        Self {
            working_dir: Some(working_dir),
        }
    }
}

/// Exit code of a finished child; death by signal maps to `128 + signal`.
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> Result<i32> {
        debug!("Executing command: {} in {:?}", command, self.working_dir);

        let mut expression = duct::cmd!("sh", "-c", command).unchecked();
        if let Some(dir) = &self.working_dir {
            expression = expression.dir(dir);
        }

        let handle = expression
            .start()
            .with_context(|| format!("Failed to spawn process for command: {}", command))?;

        let mut wait = tokio::task::spawn_blocking(move || handle.wait().map(|output| output.status));

        // The child shares our process group, so Ctrl-C reaches it directly.
        // We only report the interrupt and keep waiting for the real exit status.
        let status = loop {
            tokio::select! {
                joined = &mut wait => {
                    break joined
                        .map_err(|e| anyhow!("wait task failed: {}", e))?
                        .context("Failed to wait for command")?;
                }
                signal = tokio::signal::ctrl_c() => {
                    if signal.is_ok() {
                        warn!(command, "Interrupt received while command is running; waiting for it to exit");
                    }
                }
            }
        };

        let code = exit_code_of(status);
        info!(command, exit_code = code, "Command finished");
        Ok(code)
    }
}
