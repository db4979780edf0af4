// ai4kali-core/src/gate.rs

//! Execution gate states and the user-facing seams it drives.
//!
//! ```text
//! Generated -> Presented -> Confirmed -> Executed(code)
//!                        |            \-> Aborted(reason)   (re-check failed)
//!                        |-> Rejected -> Aborted(user-cancelled)
//!                        \-> Skipped(reason) -> Aborted(reason)
//! ```
//!
//! Turns that never produce a candidate go straight from `Generated` to
//! `Aborted` (model failure, empty output, declined).

use crate::errors::ModelError;
use crate::safety::Classification;
use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use uuid::Uuid;

/// Answer to "run this command?".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
    /// Interrupt or end of input. Treated exactly like `No`.
    Cancelled,
    /// The user rewrote the command; the new text replaces the candidate.
    Edited(String),
}

/// Things the gate wants the user to know, beyond the command itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// The command matched a deny-list rule and will not run.
    Dangerous { pattern: String },
    /// First token is not a known tool; execution needs explicit confirmation.
    UnrecognizedTool,
    /// First token is not a known tool and the policy forbids running it.
    UnrecognizedToolBlocked,
    /// Auto-confirm was requested but does not cover unrecognized commands.
    AutoConfirmIgnored,
    /// The explanation could not be produced.
    ExplainFailed(ModelError),
    /// Dry-run: shown, not executed.
    DryRun,
    /// The model answered with the sentinel.
    ModelDeclined,
}

/// Presentation and confirmation capability. Keeps the gate free of terminals.
#[async_trait]
pub trait UserInteraction: Send + Sync {
    /// Shows the candidate verbatim with its classification.
    fn show_command(&self, command: &str, classification: &Classification);

    fn show_explanation(&self, explanation: &str);

    fn show_notice(&self, notice: &Notice);

    async fn confirm(&self, command: &str) -> Result<Confirmation>;
}

/// Why a turn ended without executing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    Dangerous,
    Unrecognized,
    UserCancelled,
    ModelEmpty,
    ModelError,
    DecodeError,
    ModelDeclined,
    DryRun,
}

impl AbortReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbortReason::Dangerous => "dangerous",
            AbortReason::Unrecognized => "unrecognized",
            AbortReason::UserCancelled => "user-cancelled",
            AbortReason::ModelEmpty => "model-empty",
            AbortReason::ModelError => "model-error",
            AbortReason::DecodeError => "decode-error",
            AbortReason::ModelDeclined => "model-declined",
            AbortReason::DryRun => "dry-run",
        }
    }

    /// Process exit code for a one-shot invocation ending here.
    pub fn exit_code(&self) -> i32 {
        match self {
            AbortReason::UserCancelled | AbortReason::ModelDeclined | AbortReason::DryRun => 0,
            AbortReason::Dangerous
            | AbortReason::Unrecognized
            | AbortReason::ModelEmpty
            | AbortReason::ModelError
            | AbortReason::DecodeError => 1,
        }
    }

    pub fn from_model_error(error: &ModelError) -> Self {
        match error {
            ModelError::Decode(_) => AbortReason::DecodeError,
            ModelError::Cancelled => AbortReason::UserCancelled,
            ModelError::NotFound(_) | ModelError::Timeout(_) | ModelError::Backend(_) => {
                AbortReason::ModelError
            }
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateState {
    Generated,
    Presented,
    Confirmed,
    Rejected,
    Skipped(AbortReason),
    Executed(i32),
    Aborted(AbortReason),
}

impl GateState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GateState::Executed(_) | GateState::Aborted(_))
    }

    fn can_advance_to(&self, next: &GateState) -> bool {
        use GateState::*;
        match (self, next) {
            (Generated, Presented) | (Generated, Aborted(_)) => true,
            (Presented, Confirmed) | (Presented, Rejected) | (Presented, Skipped(_)) => true,
            (Confirmed, Executed(_)) | (Confirmed, Aborted(_)) => true,
            (Rejected, Aborted(AbortReason::UserCancelled)) => true,
            (Skipped(skipped), Aborted(aborted)) => skipped == aborted,
            _ => false,
        }
    }
}

/// `{ executed, exit_code, reason_if_skipped }` view of a finished turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub executed: bool,
    pub exit_code: Option<i32>,
    pub reason_if_skipped: Option<String>,
}

/// Per-turn switches coming from the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct TurnOptions {
    pub dry_run: bool,
    pub auto_confirm: bool,
    pub explain: bool,
}

/// Everything one turn went through. Built fresh for every request.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub turn_id: Uuid,
    pub transitions: Vec<GateState>,
    /// The command as last presented or edited.
    pub command: Option<String>,
    /// Classification of `command`, from the most recent check.
    pub classification: Option<Classification>,
    /// Raw diagnostic for model failures.
    pub detail: Option<String>,
}

impl TurnReport {
    pub(crate) fn new(turn_id: Uuid) -> Self {
        Self {
            turn_id,
            transitions: vec![GateState::Generated],
            command: None,
            classification: None,
            detail: None,
        }
    }

    pub fn state(&self) -> &GateState {
        // Never empty: starts with `Generated`.
        &self.transitions[self.transitions.len() - 1]
    }

    /// Records a transition. Illegal moves are a programming error.
    pub(crate) fn advance(&mut self, next: GateState) {
        debug_assert!(
            self.state().can_advance_to(&next),
            "illegal gate transition {:?} -> {:?}",
            self.state(),
            next
        );
        tracing::debug!(turn_id = %self.turn_id, from = ?self.state(), to = ?next, "Gate transition");
        self.transitions.push(next);
    }

    /// Moves through `Skipped(reason)` to `Aborted(reason)`.
    pub(crate) fn skip(&mut self, reason: AbortReason) {
        self.advance(GateState::Skipped(reason));
        self.advance(GateState::Aborted(reason));
    }

    pub fn reached(&self, state: &GateState) -> bool {
        self.transitions.contains(state)
    }

    pub fn was_executed(&self) -> bool {
        matches!(self.state(), GateState::Executed(_))
    }

    pub fn abort_reason(&self) -> Option<AbortReason> {
        match self.state() {
            GateState::Aborted(reason) => Some(*reason),
            _ => None,
        }
    }

    pub fn outcome(&self) -> ExecutionOutcome {
        match self.state() {
            GateState::Executed(code) => ExecutionOutcome {
                executed: true,
                exit_code: Some(*code),
                reason_if_skipped: None,
            },
            GateState::Aborted(reason) => ExecutionOutcome {
                executed: false,
                exit_code: None,
                reason_if_skipped: Some(reason.as_str().to_string()),
            },
            other => ExecutionOutcome {
                executed: false,
                exit_code: None,
                reason_if_skipped: Some(format!("unfinished ({:?})", other)),
            },
        }
    }

    /// Exit status for a one-shot invocation.
    pub fn exit_code(&self) -> i32 {
        match self.state() {
            GateState::Executed(code) => *code,
            GateState::Aborted(reason) => reason.exit_code(),
            _ => 1,
        }
    }
}
