use std::sync::Arc;

use copilot_agent::{RunOutcome, RunSequencer};
use copilot_core::config::LoadOptions;
use copilot_core::errors::SessionRejection;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::commands::{start_session, CommandResult};
use crate::console::ConsoleNotificationSink;

#[derive(Clone, Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Blank,
    Brief(&'a str),
    Improve,
    State,
    Quit,
}

impl<'a> ChatInput<'a> {
    fn parse(line: &'a str) -> Self {
        match line.trim() {
            "" => Self::Blank,
            "/improve" | "/run2" => Self::Improve,
            "/state" => Self::State,
            "/quit" | "/exit" => Self::Quit,
            brief => Self::Brief(brief),
        }
    }
}

pub fn run(options: LoadOptions) -> CommandResult {
    let session = match start_session("chat", options, Arc::new(ConsoleNotificationSink)) {
        Ok(session) => session,
        Err(failure) => return failure,
    };

    let result = session.runtime.block_on(chat_loop(
        &session.sequencer,
        tokio::io::stdin(),
        tokio::io::stdout(),
    ));

    match result {
        Ok(()) => CommandResult::success(
            "chat",
            format!("session closed after {} turns", session.sequencer.snapshot().turns.len()),
        ),
        Err(error) => CommandResult::failure("chat", "io", error.to_string(), 1),
    }
}

/// Reads briefs line by line until `/quit` or end of input. Blank lines are
/// dropped here so the sequencer never receives an empty brief.
pub async fn chat_loop<R, W>(
    sequencer: &RunSequencer,
    input: R,
    mut output: W,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    output
        .write_all(b"Describe your client (/improve for Run 2, /state, /quit):\n")
        .await?;
    output.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let rendered = match ChatInput::parse(&line) {
            ChatInput::Blank => continue,
            ChatInput::Quit => break,
            ChatInput::State => serde_json::to_string_pretty(&sequencer.snapshot())
                .map_err(|error| std::io::Error::new(std::io::ErrorKind::Other, error))?,
            ChatInput::Improve => render(sequencer, sequencer.run_improved_pass().await),
            ChatInput::Brief(brief) => render(sequencer, sequencer.submit(brief).await),
        };

        output.write_all(rendered.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }

    Ok(())
}

fn render(sequencer: &RunSequencer, result: Result<RunOutcome, SessionRejection>) -> String {
    let locale = sequencer.locale();
    match result {
        Ok(RunOutcome::Succeeded { run_type, recommendation }) => {
            format!("copilot [{}]> {recommendation}", run_type.label().unwrap_or("Run 1"))
        }
        Ok(RunOutcome::Failed { .. }) => {
            let apology = sequencer
                .snapshot()
                .turns
                .last()
                .map(|turn| turn.content().to_string())
                .unwrap_or_default();
            format!("copilot> {apology}")
        }
        Err(SessionRejection::BaselineRequired) => format!("! {}", locale.baseline_required()),
        Err(SessionRejection::Busy) => format!("! {}", locale.busy()),
    }
}
