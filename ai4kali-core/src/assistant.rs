// ai4kali-core/src/assistant.rs
use crate::client::ModelClient;
use crate::config::{Config, ShapePolicy};
use crate::errors::GateError;
use crate::exec::CommandRunner;
use crate::gate::{
    AbortReason, Confirmation, GateState, Notice, TurnOptions, TurnReport, UserInteraction,
};
use crate::normalize::{normalize, Normalized};
use crate::prompt::build_prompt;
use crate::safety::{Classification, SafetyClassifier};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// One user turn. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct Request {
    pub id: Uuid,
    pub text: String,
    pub model_id: String,
    pub timeout: Duration,
}

impl Request {
    pub fn new(text: impl Into<String>, config: &Config) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            model_id: config.model.clone(),
            timeout: config.timeout(),
        }
    }
}

/// Runs the pipeline: prompt, model, normalize, classify, gate, execute.
///
/// Holds only read-only collaborators, so one instance serves every turn of a session.
pub struct Assistant<UI: UserInteraction> {
    client: ModelClient,
    classifier: SafetyClassifier,
    shape_policy: ShapePolicy,
    ui_handler: Arc<UI>,
    runner: Box<dyn CommandRunner>,
}

impl<UI: UserInteraction> Assistant<UI> {
    pub fn new(
        config: &Config,
        client: ModelClient,
        ui_handler: Arc<UI>,
        runner: Box<dyn CommandRunner>,
    ) -> anyhow::Result<Self> {
        let classifier = SafetyClassifier::from_config(&config.safety)?;
        Ok(Self {
            client,
            classifier,
            shape_policy: config.safety.shape_policy,
            ui_handler,
            runner,
        })
    }

    pub fn client(&self) -> &ModelClient {
        &self.client
    }

    /// Drives one request to a terminal state.
    ///
    /// Model, safety and user outcomes are terminal states in the report.
    /// `Err` is reserved for a broken terminal or a shell that cannot start.
    pub async fn run_turn(
        &self,
        request: &Request,
        options: TurnOptions,
        cancel: &CancellationToken,
    ) -> Result<TurnReport, GateError> {
        info!(turn_id = %request.id, model = %request.model_id, query = %request.text, "Starting turn");
        let mut report = TurnReport::new(request.id);

        let prompt = build_prompt(&request.text);
        let raw = match self
            .client
            .complete(&prompt, &request.model_id, request.timeout, cancel)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                error!(turn_id = %request.id, error = %e, "Model request failed");
                report.detail = Some(e.to_string());
                report.advance(GateState::Aborted(AbortReason::from_model_error(&e)));
                return Ok(report);
            }
        };
        debug!(turn_id = %request.id, raw = %raw, "Raw model output");

        let candidate = match normalize(&raw) {
            Normalized::Command(candidate) => candidate,
            Normalized::NoCommand => {
                info!(turn_id = %request.id, "Model declined the request");
                self.ui_handler.show_notice(&Notice::ModelDeclined);
                report.advance(GateState::Aborted(AbortReason::ModelDeclined));
                return Ok(report);
            }
            Normalized::Empty => {
                warn!(turn_id = %request.id, "Model returned no usable line");
                report.detail = Some("the model returned nothing usable".to_string());
                report.advance(GateState::Aborted(AbortReason::ModelEmpty));
                return Ok(report);
            }
        };

        let mut command = candidate.raw_line;
        let classification = self.classifier.classify(&command);
        self.ui_handler.show_command(&command, &classification);
        report.command = Some(command.clone());
        report.classification = Some(classification.clone());
        report.advance(GateState::Presented);

        if let Some(reason) = self.blocking_reason(&classification) {
            return Ok(self.skip(report, reason, &classification));
        }
        if !classification.resembles_known_tool {
            self.ui_handler.show_notice(&Notice::UnrecognizedTool);
        }

        if options.explain {
            match self
                .client
                .explain(&command, &request.model_id, request.timeout, cancel)
                .await
            {
                Ok(text) => self.ui_handler.show_explanation(&text),
                Err(e) => self.ui_handler.show_notice(&Notice::ExplainFailed(e)),
            }
        }

        if options.dry_run {
            self.ui_handler.show_notice(&Notice::DryRun);
            report.skip(AbortReason::DryRun);
            return Ok(report);
        }

        let auto = options.auto_confirm && classification.resembles_known_tool;
        if options.auto_confirm && !auto {
            self.ui_handler.show_notice(&Notice::AutoConfirmIgnored);
        }

        let answer = if auto {
            Confirmation::Yes
        } else {
            self.ui_handler
                .confirm(&command)
                .await
                .map_err(GateError::Ui)?
        };

        match answer {
            Confirmation::Yes => {}
            Confirmation::Edited(edited) => {
                info!(turn_id = %request.id, original = %command, edited = %edited, "User edited the command");
                command = edited.trim().to_string();
                report.command = Some(command.clone());
            }
            Confirmation::No | Confirmation::Cancelled => {
                info!(turn_id = %request.id, "User declined execution");
                report.advance(GateState::Rejected);
                report.advance(GateState::Aborted(AbortReason::UserCancelled));
                return Ok(report);
            }
        }
        report.advance(GateState::Confirmed);

        // Authoritative re-check right before execution.
        let recheck = self.classifier.classify(&command);
        report.classification = Some(recheck.clone());
        if command.is_empty() {
            report.advance(GateState::Aborted(AbortReason::UserCancelled));
            return Ok(report);
        }
        if let Some(reason) = self.blocking_reason(&recheck) {
            warn!(turn_id = %request.id, command = %command, reason = %reason, "Re-check blocked execution");
            self.notify_block(reason, &recheck);
            report.advance(GateState::Aborted(reason));
            return Ok(report);
        }

        let code = self.runner.run(&command).await.map_err(GateError::Exec)?;
        info!(turn_id = %request.id, exit_code = code, "Turn executed");
        report.advance(GateState::Executed(code));
        Ok(report)
    }

    /// Hard blocks: deny-list hits always, unknown tools only under `ShapePolicy::Block`.
    fn blocking_reason(&self, classification: &Classification) -> Option<AbortReason> {
        if classification.is_dangerous {
            Some(AbortReason::Dangerous)
        } else if !classification.resembles_known_tool && self.shape_policy == ShapePolicy::Block {
            Some(AbortReason::Unrecognized)
        } else {
            None
        }
    }

    fn notify_block(&self, reason: AbortReason, classification: &Classification) {
        let notice = match reason {
            AbortReason::Dangerous => Notice::Dangerous {
                pattern: classification
                    .matched_pattern
                    .clone()
                    .unwrap_or_else(|| "deny-list".to_string()),
            },
            _ => Notice::UnrecognizedToolBlocked,
        };
        self.ui_handler.show_notice(&notice);
    }

    fn skip(&self, mut report: TurnReport, reason: AbortReason, classification: &Classification) -> TurnReport {
        warn!(
            turn_id = %report.turn_id,
            reason = %reason,
            pattern = classification.matched_pattern.as_deref().unwrap_or("-"),
            "Command will not be executed"
        );
        self.notify_block(reason, classification);
        report.skip(reason);
        report
    }
}
