use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by the recommendation service adapter.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("recommendation service returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("recommendation service unreachable: {0}")]
    Transport(String),
    #[error("malformed recommendation response: {0}")]
    MalformedResponse(String),
}

/// User-facing class of a failed run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RateLimited,
    QuotaExhausted,
    Generic,
}

impl FailureKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => Self::RateLimited,
            402 => Self::QuotaExhausted,
            _ => Self::Generic,
        }
    }

    /// Legacy classification for errors that only carry text.
    pub fn from_message(message: &str) -> Self {
        if message.contains("429") {
            Self::RateLimited
        } else if message.contains("402") {
            Self::QuotaExhausted
        } else {
            Self::Generic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::QuotaExhausted => "quota_exhausted",
            Self::Generic => "generic",
        }
    }
}

impl ServiceError {
    /// Status codes win; the message is only inspected when no status exists.
    pub fn classify(&self) -> FailureKind {
        match self {
            Self::Status { status, .. } => FailureKind::from_status(*status),
            Self::Transport(message) => FailureKind::from_message(message),
            Self::MalformedResponse(_) => FailureKind::Generic,
        }
    }
}

/// Why the sequencer refused to start a run.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRejection {
    #[error("baseline run required first")]
    BaselineRequired,
    #[error("a submission is already in flight")]
    Busy,
}
