// Session: the single in-memory analysis session and its lifecycle controller.
// Only `SessionController` mutates `SessionState`; everyone else reads snapshots.

pub mod controller;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analysis::models::AnalysisResult;

/// Lifecycle stage of the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Phase {
    #[default]
    Idle,
    Analyzing,
    Succeeded,
    Failed,
}

/// Everything the page needs to render the session.
///
/// Invariants, upheld by the controller:
/// - `result` is `Some` iff `phase == Succeeded`
/// - `error_message` is `Some` iff `phase == Failed`
/// - `validation_message` never moves the phase
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub phase: Phase,
    pub result: Option<AnalysisResult>,
    pub error_message: Option<String>,
    pub validation_message: Option<String>,
    pub resume_text: String,
    pub job_description: String,
    pub analyzed_at: Option<DateTime<Utc>>,
    /// Bumped on every admitted start and every reset; stale completions are dropped.
    #[serde(skip)]
    epoch: u64,
    /// Set while a model call is outstanding. Survives `reset`; only the
    /// call's own completion clears it.
    #[serde(skip)]
    in_flight: bool,
}

impl SessionState {
    /// True while a model call is outstanding, even if the session was reset
    /// after the call began.
    pub fn is_busy(&self) -> bool {
        self.phase == Phase::Analyzing || self.in_flight
    }
}

/// What a call to `start` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    /// An analysis was already in flight (possibly from before a reset); nothing changed.
    Busy,
    /// An input buffer was blank; the validation message was set.
    Invalid,
    Succeeded,
    Failed,
    /// The session was reset while the request was in flight; its outcome was dropped.
    Discarded,
}
