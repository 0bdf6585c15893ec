use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeSeverity {
    Informational,
    Destructive,
}

impl NoticeSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Informational => "informational",
            Self::Destructive => "destructive",
        }
    }
}

/// Toast-style status message for the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub severity: NoticeSeverity,
    pub emitted_at: DateTime<Utc>,
}

impl Notice {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        severity: NoticeSeverity,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
            emitted_at: Utc::now(),
        }
    }

    pub fn informational(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, NoticeSeverity::Informational)
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(title, description, NoticeSeverity::Destructive)
    }
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

#[derive(Clone, Default)]
pub struct InMemoryNotificationSink {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl InMemoryNotificationSink {
    pub fn notices(&self) -> Vec<Notice> {
        match self.notices.lock() {
            Ok(notices) => notices.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl NotificationSink for InMemoryNotificationSink {
    fn notify(&self, notice: Notice) {
        match self.notices.lock() {
            Ok(mut notices) => notices.push(notice),
            Err(poisoned) => poisoned.into_inner().push(notice),
        }
    }
}

/// Sink for headless runs: notices only reach the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotificationSink;

impl NotificationSink for TracingNotificationSink {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            NoticeSeverity::Informational => info!(
                event_name = "session.notice",
                severity = notice.severity.as_str(),
                title = %notice.title,
                "{}",
                notice.description
            ),
            NoticeSeverity::Destructive => warn!(
                event_name = "session.notice",
                severity = notice.severity.as_str(),
                title = %notice.title,
                "{}",
                notice.description
            ),
        }
    }
}
