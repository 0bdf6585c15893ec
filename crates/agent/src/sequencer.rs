//! Run sequencing for one copilot session.
//!
//! The sequencer owns the whole session state (conversation log, current run
//! type, current recommendation) and is the only place that mutates it. Each
//! submission follows the same path:
//!
//! 1. acquire the busy flag (released by guard on every exit path)
//! 2. record the user turn and pick `baseline` or `improved`
//! 3. await the recommendation service once
//! 4. record the assistant turn and emit a notice for the outcome
//!
//! The state mutex is never held across the remote call, so snapshots stay
//! readable while a submission is in flight.

use std::sync::{Arc, Mutex, MutexGuard};

use copilot_core::domain::conversation::Turn;
use copilot_core::domain::run::RunType;
use copilot_core::errors::{FailureKind, ServiceError, SessionRejection};
use copilot_core::locale::Locale;
use copilot_core::notice::{Notice, NotificationSink};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::busy::BusyFlag;
use crate::conversation::ConversationLog;
use crate::recommender::{RecommendationRequest, RecommendationService};

#[derive(Debug, Default)]
struct SessionState {
    log: ConversationLog,
    run_type: RunType,
    recommendation: Option<String>,
}

/// Read-only view handed to the rendering layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub turns: Vec<Turn>,
    pub recommendation: Option<String>,
    pub run_type: RunType,
    pub busy: bool,
    pub can_run_improved: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded { run_type: RunType, recommendation: String },
    Failed { run_type: RunType, failure: FailureKind, message: String },
}

impl RunOutcome {
    pub fn run_type(&self) -> RunType {
        match self {
            Self::Succeeded { run_type, .. } | Self::Failed { run_type, .. } => *run_type,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

pub struct RunSequencer {
    session_id: Uuid,
    locale: Locale,
    service: Arc<dyn RecommendationService>,
    notices: Arc<dyn NotificationSink>,
    state: Mutex<SessionState>,
    busy: BusyFlag,
}

impl RunSequencer {
    pub fn new(
        service: Arc<dyn RecommendationService>,
        notices: Arc<dyn NotificationSink>,
        locale: Locale,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            locale,
            service,
            notices,
            state: Mutex::new(SessionState::default()),
            busy: BusyFlag::default(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn run_type(&self) -> RunType {
        self.lock_state().run_type
    }

    pub fn recommendation(&self) -> Option<String> {
        self.lock_state().recommendation.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let busy = self.is_busy();
        let state = self.lock_state();
        SessionSnapshot {
            session_id: self.session_id,
            turns: state.log.turns().to_vec(),
            recommendation: state.recommendation.clone(),
            run_type: state.run_type,
            busy,
            can_run_improved: state.recommendation.is_some() && !busy,
        }
    }

    /// Sends `content` as the next brief. Service failures are folded into
    /// the conversation and returned as [`RunOutcome::Failed`]; only a
    /// concurrent submission is rejected.
    pub async fn submit(&self, content: &str) -> Result<RunOutcome, SessionRejection> {
        let Some(_busy) = self.busy.try_acquire() else {
            debug!(
                event_name = "session.submit.rejected",
                correlation_id = %self.session_id,
                reason = "busy",
                "submission rejected while another is in flight"
            );
            return Err(SessionRejection::Busy);
        };

        let run_type = {
            let mut state = self.lock_state();
            state.log.append(Turn::user(content));
            state.run_type.next_submission()
        };

        info!(
            event_name = "session.submit.started",
            correlation_id = %self.session_id,
            run_type = run_type.as_str(),
            brief_chars = content.chars().count(),
            "submitting brief to recommendation service"
        );

        let result = self.service.recommend(&RecommendationRequest::new(content, run_type)).await;
        Ok(self.settle(run_type, result))
    }

    /// Re-sends the most recent user brief as the next pass.
    pub async fn run_improved_pass(&self) -> Result<RunOutcome, SessionRejection> {
        if self.is_busy() {
            return Err(SessionRejection::Busy);
        }

        let last_brief =
            self.lock_state().log.last_user_turn().map(|turn| turn.content().to_string());
        let Some(brief) = last_brief else {
            warn!(
                event_name = "session.improved_pass.rejected",
                correlation_id = %self.session_id,
                reason = "baseline_required",
                "improved pass requested before any brief was submitted"
            );
            self.notices.notify(Notice::destructive(
                self.locale.warning_title(),
                self.locale.baseline_required(),
            ));
            return Err(SessionRejection::BaselineRequired);
        };

        self.submit(&brief).await
    }

    fn settle(&self, run_type: RunType, result: Result<String, ServiceError>) -> RunOutcome {
        match result {
            Ok(recommendation) => {
                {
                    let mut state = self.lock_state();
                    debug_assert!(state.run_type.can_transition_to(run_type));
                    state.log.append(Turn::assistant(recommendation.clone()));
                    state.recommendation = Some(recommendation.clone());
                    state.run_type = run_type;
                }

                info!(
                    event_name = "session.submit.succeeded",
                    correlation_id = %self.session_id,
                    run_type = run_type.as_str(),
                    "recommendation recorded"
                );
                self.notices.notify(Notice::informational(
                    self.locale.success_title(),
                    self.locale.success_description(run_type),
                ));

                RunOutcome::Succeeded { run_type, recommendation }
            }
            Err(error) => {
                let failure = error.classify();
                let message = self.locale.failure_message(failure).to_string();

                self.lock_state().log.append(Turn::assistant(self.locale.failure_turn(failure)));

                warn!(
                    event_name = "session.submit.failed",
                    correlation_id = %self.session_id,
                    run_type = run_type.as_str(),
                    failure = failure.as_str(),
                    error = %error,
                    "recommendation service call failed"
                );
                self.notices.notify(Notice::destructive(self.locale.error_title(), message.clone()));

                RunOutcome::Failed { run_type, failure, message }
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use copilot_core::domain::conversation::Role;
    use copilot_core::domain::run::RunType;
    use copilot_core::errors::{FailureKind, ServiceError, SessionRejection};
    use copilot_core::locale::Locale;
    use copilot_core::notice::{InMemoryNotificationSink, NoticeSeverity};
    use tokio::sync::Notify;

    use super::{RunOutcome, RunSequencer};
    use crate::recommender::{RecommendationRequest, RecommendationService};

    #[derive(Default)]
    struct ScriptedService {
        replies: Mutex<VecDeque<Result<String, ServiceError>>>,
        requests: Mutex<Vec<RecommendationRequest>>,
    }

    impl ScriptedService {
        fn new(replies: Vec<Result<String, ServiceError>>) -> Arc<Self> {
            Arc::new(Self { replies: Mutex::new(replies.into()), requests: Mutex::default() })
        }

        fn requests(&self) -> Vec<RecommendationRequest> {
            self.requests.lock().expect("requests lock").clone()
        }
    }

    #[async_trait]
    impl RecommendationService for ScriptedService {
        async fn recommend(&self, request: &RecommendationRequest) -> Result<String, ServiceError> {
            self.requests.lock().expect("requests lock").push(request.clone());
            self.replies
                .lock()
                .expect("replies lock")
                .pop_front()
                .unwrap_or_else(|| Err(ServiceError::Transport("script exhausted".to_string())))
        }
    }

    struct GatedService {
        release: Arc<Notify>,
    }

    #[async_trait]
    impl RecommendationService for GatedService {
        async fn recommend(&self, request: &RecommendationRequest) -> Result<String, ServiceError> {
            self.release.notified().await;
            Ok(format!("gated {}", request.client_brief))
        }
    }

    fn status(code: u16) -> ServiceError {
        ServiceError::Status { status: code, message: format!("status {code}") }
    }

    fn sequencer(
        service: Arc<dyn RecommendationService>,
    ) -> (RunSequencer, InMemoryNotificationSink) {
        let sink = InMemoryNotificationSink::default();
        (RunSequencer::new(service, Arc::new(sink.clone()), Locale::Es), sink)
    }

    #[tokio::test]
    async fn first_submission_runs_baseline_and_records_recommendation() {
        let service = ScriptedService::new(vec![Ok("Honda Odyssey 2019".to_string())]);
        let (sequencer, sink) = sequencer(service.clone());

        let outcome = sequencer.submit("Family of 4, budget $20k").await.expect("not busy");

        assert_eq!(
            outcome,
            RunOutcome::Succeeded {
                run_type: RunType::Baseline,
                recommendation: "Honda Odyssey 2019".to_string()
            }
        );
        assert_eq!(sequencer.run_type(), RunType::Baseline);
        assert_eq!(sequencer.recommendation().as_deref(), Some("Honda Odyssey 2019"));
        assert_eq!(service.requests()[0].run_type, RunType::Baseline);
        assert_eq!(service.requests()[0].client_brief, "Family of 4, budget $20k");

        let notices = sink.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].severity, NoticeSeverity::Informational);
        assert_eq!(notices[0].title, "✅ Recomendación generada");
        assert!(notices[0].description.contains("Run 1"));
    }

    #[tokio::test]
    async fn improved_pass_resends_same_brief_and_overwrites_recommendation() {
        let service = ScriptedService::new(vec![
            Ok("baseline pick".to_string()),
            Ok("improved pick".to_string()),
        ]);
        let (sequencer, sink) = sequencer(service.clone());

        sequencer.submit("Family of 4, budget $20k").await.expect("not busy");
        let outcome = sequencer.run_improved_pass().await.expect("improved pass accepted");

        assert_eq!(outcome.run_type(), RunType::Improved);
        assert_eq!(sequencer.run_type(), RunType::Improved);
        assert_eq!(sequencer.recommendation().as_deref(), Some("improved pick"));

        let requests = service.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].client_brief, "Family of 4, budget $20k");
        assert_eq!(requests[1].run_type, RunType::Improved);

        let notices = sink.notices();
        assert!(notices[1].description.contains("Run 2"));

        let snapshot = sequencer.snapshot();
        assert_eq!(snapshot.turns.len(), 4);
        assert_eq!(snapshot.turns[2].role(), Role::User);
        assert_eq!(snapshot.turns[2].content(), "Family of 4, budget $20k");
    }

    #[tokio::test]
    async fn rate_limited_first_submission_leaves_run_state_untouched() {
        let service = ScriptedService::new(vec![Err(status(429))]);
        let (sequencer, sink) = sequencer(service);

        let outcome = sequencer.submit("Family of 4, budget $20k").await.expect("not busy");

        assert_eq!(
            outcome,
            RunOutcome::Failed {
                run_type: RunType::Baseline,
                failure: FailureKind::RateLimited,
                message: "Límite de solicitudes excedido. Por favor espera un momento.".to_string()
            }
        );
        assert_eq!(sequencer.run_type(), RunType::None);
        assert!(sequencer.recommendation().is_none());

        let snapshot = sequencer.snapshot();
        assert_eq!(snapshot.turns.len(), 2);
        assert_eq!(snapshot.turns[0].role(), Role::User);
        assert_eq!(snapshot.turns[1].role(), Role::Assistant);
        assert_eq!(
            snapshot.turns[1].content(),
            "Lo siento, Límite de solicitudes excedido. Por favor espera un momento."
        );

        let notices = sink.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "❌ Error");
        assert_eq!(notices[0].severity, NoticeSeverity::Destructive);
    }

    #[tokio::test]
    async fn quota_failure_after_baseline_keeps_previous_recommendation() {
        let service = ScriptedService::new(vec![Ok("first".to_string()), Err(status(402))]);
        let (sequencer, _sink) = sequencer(service);

        sequencer.submit("brief").await.expect("not busy");
        let outcome = sequencer.run_improved_pass().await.expect("accepted");

        assert!(matches!(
            outcome,
            RunOutcome::Failed { run_type: RunType::Improved, failure: FailureKind::QuotaExhausted, .. }
        ));
        assert_eq!(sequencer.run_type(), RunType::Baseline);
        assert_eq!(sequencer.recommendation().as_deref(), Some("first"));
        assert!(sequencer.snapshot().turns[3].content().starts_with("Lo siento, Créditos agotados"));
    }

    #[tokio::test]
    async fn improved_pass_without_turns_is_rejected_with_warning_only() {
        let service = ScriptedService::new(Vec::new());
        let (sequencer, sink) = sequencer(service.clone());

        let rejection = sequencer.run_improved_pass().await.expect_err("must be rejected");

        assert_eq!(rejection, SessionRejection::BaselineRequired);
        assert!(sequencer.snapshot().turns.is_empty());
        assert!(service.requests().is_empty());
        assert_eq!(sequencer.run_type(), RunType::None);

        let notices = sink.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].title, "⚠️ Advertencia");
        assert_eq!(notices[0].description, "Primero debes ejecutar el análisis baseline (Run 1)");
    }

    #[tokio::test]
    async fn only_first_successful_submission_is_baseline() {
        let service = ScriptedService::new(vec![
            Err(status(500)),
            Ok("a".to_string()),
            Err(status(429)),
            Ok("b".to_string()),
            Ok("c".to_string()),
        ]);
        let (sequencer, _sink) = sequencer(service.clone());

        let mut successful_run_types = Vec::new();
        for (index, brief) in ["one", "two", "three", "four", "five"].iter().enumerate() {
            let outcome = sequencer.submit(brief).await.expect("not busy");
            if outcome.is_success() {
                successful_run_types.push(outcome.run_type());
            }

            let snapshot = sequencer.snapshot();
            assert_eq!(snapshot.turns.len(), (index + 1) * 2, "each submit appends two turns");
            assert!(!snapshot.busy, "busy flag should clear after submit {index}");
        }

        assert_eq!(
            successful_run_types,
            vec![RunType::Baseline, RunType::Improved, RunType::Improved]
        );
        let requested = service.requests().iter().map(|request| request.run_type).collect::<Vec<_>>();
        assert_eq!(
            requested,
            vec![
                RunType::Baseline,
                RunType::Baseline,
                RunType::Improved,
                RunType::Improved,
                RunType::Improved
            ]
        );
    }

    #[tokio::test]
    async fn improved_pass_targets_latest_user_brief() {
        let service = ScriptedService::new(vec![
            Ok("for A".to_string()),
            Err(status(500)),
            Ok("for B".to_string()),
        ]);
        let (sequencer, _sink) = sequencer(service.clone());

        sequencer.submit("brief A").await.expect("not busy");
        sequencer.submit("brief B").await.expect("not busy");
        sequencer.run_improved_pass().await.expect("accepted");

        let requests = service.requests();
        assert_eq!(requests[2].client_brief, "brief B");
        assert_eq!(sequencer.recommendation().as_deref(), Some("for B"));
    }

    #[tokio::test]
    async fn busy_flag_is_visible_in_flight_and_blocks_overlapping_runs() {
        let release = Arc::new(Notify::new());
        let service = Arc::new(GatedService { release: release.clone() });
        let (sequencer, _sink) = sequencer(service);
        let sequencer = Arc::new(sequencer);

        let in_flight = {
            let sequencer = sequencer.clone();
            tokio::spawn(async move { sequencer.submit("slow brief").await })
        };

        for _ in 0..200 {
            if sequencer.is_busy() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let snapshot = sequencer.snapshot();
        assert!(snapshot.busy, "submission should be in flight");
        assert!(!snapshot.can_run_improved);
        assert_eq!(snapshot.turns.len(), 1, "user turn is recorded before the reply");

        assert_eq!(sequencer.submit("overlap").await, Err(SessionRejection::Busy));
        assert_eq!(sequencer.run_improved_pass().await, Err(SessionRejection::Busy));

        release.notify_one();
        let outcome = in_flight.await.expect("task joined").expect("not busy");

        assert!(outcome.is_success());
        let snapshot = sequencer.snapshot();
        assert!(!snapshot.busy);
        assert!(snapshot.can_run_improved);
        assert_eq!(snapshot.turns.len(), 2);
    }

    #[tokio::test]
    async fn english_locale_localizes_synthesized_turn() {
        let service = ScriptedService::new(vec![Err(ServiceError::Transport(
            "connection reset".to_string(),
        ))]);
        let sink = InMemoryNotificationSink::default();
        let sequencer = RunSequencer::new(service, Arc::new(sink.clone()), Locale::En);

        sequencer.submit("brief").await.expect("not busy");

        assert_eq!(
            sequencer.snapshot().turns[1].content(),
            "Sorry, an error occurred while generating the recommendation"
        );
        assert_eq!(
            sink.notices()[0].description,
            "An error occurred while generating the recommendation"
        );
    }
}
