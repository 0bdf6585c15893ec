//! Session runtime for the retail copilot demo.
//!
//! This crate drives one interactive session against the remote
//! recommendation service:
//! - records the conversation (`conversation`)
//! - calls the recommendation function over HTTP (`recommender`)
//! - decides between the baseline and the improved pass (`sequencer`)
//!
//! # Run model
//!
//! The first successful submission is the baseline run ("Run 1"). Every later
//! submission, including the improved pass that re-sends the latest brief,
//! is an improved run ("Run 2"). Failures never advance the run state; they
//! become an apology turn in the conversation and a destructive notice.
//!
//! # Key Types
//!
//! - `RunSequencer` - owns the session state and the single mutation path
//! - `RecommendationService` - seam for the remote service (HTTP or fake)
//! - `SessionSnapshot` - read-only view for rendering

pub mod busy;
pub mod conversation;
pub mod recommender;
pub mod sequencer;

pub use conversation::ConversationLog;
pub use recommender::{HttpRecommendationClient, RecommendationRequest, RecommendationService};
pub use sequencer::{RunOutcome, RunSequencer, SessionSnapshot};
