pub mod ask;
pub mod chat;
pub mod config;
pub mod doctor;

use std::sync::Arc;

use copilot_agent::{HttpRecommendationClient, RunSequencer};
use copilot_core::config::{AppConfig, LoadOptions};
use copilot_core::notice::NotificationSink;
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Everything a session-driving command needs: validated config, logging,
/// an async runtime and a sequencer wired to the HTTP client.
pub(crate) struct SessionRuntime {
    pub runtime: tokio::runtime::Runtime,
    pub sequencer: RunSequencer,
}

pub(crate) fn start_session(
    command: &str,
    options: LoadOptions,
    notices: Arc<dyn NotificationSink>,
) -> Result<SessionRuntime, CommandResult> {
    let config = AppConfig::load(options)
        .map_err(|error| CommandResult::failure(command, "config_validation", error.to_string(), 2))?;
    crate::logging::init(&config);

    let client = HttpRecommendationClient::from_config(&config.service)
        .map_err(|error| CommandResult::failure(command, "client_init", error.to_string(), 4))?;
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(
        |error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                5,
            )
        },
    )?;

    tracing::info!(
        event_name = "cli.session.started",
        command,
        endpoint = client.endpoint(),
        locale = config.session.locale.as_str(),
        "copilot session ready"
    );

    let sequencer = RunSequencer::new(Arc::new(client), notices, config.session.locale);
    Ok(SessionRuntime { runtime, sequencer })
}
