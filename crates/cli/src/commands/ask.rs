use std::sync::Arc;

use copilot_agent::{RunOutcome, SessionSnapshot};
use copilot_core::config::LoadOptions;
use copilot_core::errors::SessionRejection;
use serde::Serialize;

use crate::commands::{start_session, CommandResult};
use crate::console::ConsoleNotificationSink;

#[derive(Debug, Clone, Default)]
pub struct AskRequest {
    pub options: LoadOptions,
    pub brief: String,
    pub improve: bool,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct AskReport<'a> {
    command: &'static str,
    status: &'static str,
    outcome: &'a RunOutcome,
    snapshot: &'a SessionSnapshot,
}

pub fn run(request: AskRequest) -> CommandResult {
    let brief = request.brief.trim().to_string();
    if brief.is_empty() {
        return CommandResult::failure("ask", "invalid_input", "brief must not be empty", 3);
    }

    let session = match start_session("ask", request.options, Arc::new(ConsoleNotificationSink)) {
        Ok(session) => session,
        Err(failure) => return failure,
    };
    let sequencer = &session.sequencer;

    let result = session.runtime.block_on(async {
        let baseline = sequencer.submit(&brief).await?;
        if request.improve && baseline.is_success() {
            sequencer.run_improved_pass().await
        } else {
            Ok(baseline)
        }
    });

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(rejection) => return rejected(rejection),
    };
    let exit_code = if outcome.is_success() { 0 } else { 1 };

    if request.json {
        let snapshot = sequencer.snapshot();
        let report = AskReport {
            command: "ask",
            status: if outcome.is_success() { "ok" } else { "error" },
            outcome: &outcome,
            snapshot: &snapshot,
        };
        return match serde_json::to_string(&report) {
            Ok(output) => CommandResult { exit_code, output },
            Err(error) => CommandResult::failure("ask", "serialization", error.to_string(), 1),
        };
    }

    let output = match &outcome {
        RunOutcome::Succeeded { run_type, recommendation } => {
            format!("[{}]\n{recommendation}", run_type.label().unwrap_or("Run 1"))
        }
        RunOutcome::Failed { .. } => sequencer
            .snapshot()
            .turns
            .last()
            .map(|turn| turn.content().to_string())
            .unwrap_or_default(),
    };
    CommandResult { exit_code, output }
}

fn rejected(rejection: SessionRejection) -> CommandResult {
    let error_class = match rejection {
        SessionRejection::BaselineRequired => "baseline_required",
        SessionRejection::Busy => "busy",
    };
    CommandResult::failure("ask", error_class, rejection.to_string(), 1)
}
