//! Session Controller — owns the analysis lifecycle:
//!
//! Idle ──start(valid)──▶ Analyzing ──ok──▶ Succeeded
//!  ▲  └─start(blank)─▶ Idle (+validation message)  └─err─▶ Failed
//!  └──────────────────────── reset ◀──────────────────────────┘
//!
//! State lives in a `watch` channel. Every transition is a single
//! check-and-modify on that channel, so a second `start` while `Analyzing`
//! cannot slip through. Subscribers see every committed state.
//!
//! A reset during `Analyzing` returns to `Idle` at once, but the model call
//! keeps running. Its `in_flight` marker outlives the reset, so `start`
//! stays `Busy` until that call lands and its outcome is dropped.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::analysis::client::AnalysisService;
use crate::analysis::models::{AnalysisRequest, AnalysisResult};
use crate::analysis::AnalysisError;
use crate::session::{Phase, SessionState, StartOutcome};

pub struct SessionController {
    state: watch::Sender<SessionState>,
    service: Arc<dyn AnalysisService>,
}

impl SessionController {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self { state, service }
    }

    /// Current state, cloned.
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Observe every future state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn set_resume_text(&self, text: String) {
        self.state.send_modify(|s| s.resume_text = text);
    }

    pub fn set_job_description(&self, text: String) {
        self.state.send_modify(|s| s.job_description = text);
    }

    /// Replaces the résumé buffer with an uploaded file's text, verbatim.
    pub fn load_resume_from_file(&self, contents: String) {
        info!("Loaded resume from file ({} bytes)", contents.len());
        self.set_resume_text(contents);
    }

    /// Runs one analysis of the current buffers and waits for its outcome.
    pub async fn start(&self) -> StartOutcome {
        let mut outcome = StartOutcome::Busy;
        let mut admitted: Option<(AnalysisRequest, u64)> = None;

        self.state.send_if_modified(|s| {
            if s.is_busy() {
                return false;
            }
            match AnalysisRequest::new(s.resume_text.clone(), s.job_description.clone()) {
                Err(e) => {
                    s.validation_message = Some(e.to_string());
                    outcome = StartOutcome::Invalid;
                }
                Ok(request) => {
                    s.epoch += 1;
                    s.in_flight = true;
                    s.phase = Phase::Analyzing;
                    s.result = None;
                    s.error_message = None;
                    s.validation_message = None;
                    s.analyzed_at = None;
                    admitted = Some((request, s.epoch));
                }
            }
            true
        });

        let Some((request, epoch)) = admitted else {
            match outcome {
                StartOutcome::Busy => warn!("Ignoring start: an analysis is already in flight"),
                _ => info!("Start rejected: resume or job description is blank"),
            }
            return outcome;
        };

        let analysis_id = Uuid::new_v4();
        let span = info_span!("analysis", %analysis_id);
        let result = async {
            info!("Analysis started");
            self.service.analyze(&request).await
        }
        .instrument(span.clone())
        .await;

        span.in_scope(|| self.finish(epoch, result))
    }

    fn finish(&self, epoch: u64, result: Result<AnalysisResult, AnalysisError>) -> StartOutcome {
        let mut outcome = StartOutcome::Discarded;

        self.state.send_if_modified(|s| {
            // Only one call is ever outstanding, so this completion owns the marker.
            s.in_flight = false;
            if s.epoch != epoch || s.phase != Phase::Analyzing {
                // Subscribers still need to see `start` become available again.
                return true;
            }
            match result {
                Ok(result) => {
                    s.phase = Phase::Succeeded;
                    s.result = Some(result);
                    s.error_message = None;
                    s.analyzed_at = Some(Utc::now());
                    outcome = StartOutcome::Succeeded;
                }
                Err(e) => {
                    s.phase = Phase::Failed;
                    s.result = None;
                    s.error_message = Some(e.to_string());
                    outcome = StartOutcome::Failed;
                }
            }
            true
        });

        match outcome {
            StartOutcome::Succeeded => info!("Analysis succeeded"),
            StartOutcome::Failed => warn!("Analysis failed"),
            _ => info!("Analysis finished after a reset; outcome discarded"),
        }
        outcome
    }

    /// Back to a fresh `Idle` session with empty buffers. Idempotent.
    pub fn reset(&self) {
        self.state.send_modify(|s| {
            let epoch = s.epoch + 1;
            let in_flight = s.in_flight;
            *s = SessionState {
                epoch,
                in_flight,
                ..SessionState::default()
            };
        });
        info!("Session reset");
    }
}
