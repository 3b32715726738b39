//! Axum route handlers for the session API the page talks to.

use std::convert::Infallible;

use anyhow::anyhow;
use axum::{
    extract::{Multipart, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::presentation::SessionView;
use crate::session::StartOutcome;
use crate::state::AppState;

/// Multipart field carrying the uploaded résumé.
const FILE_FIELD: &str = "file";

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BufferUpdate {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub outcome: StartOutcome,
    pub session: SessionView,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/session
pub async fn handle_get_session(State(state): State<AppState>) -> Json<SessionView> {
    Json(state.session.snapshot().into())
}

/// GET /api/session/events
///
/// Server-sent events: the current view first, then one `session` event per
/// state change.
pub async fn handle_session_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.session.subscribe();

    let stream = futures::stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let view = SessionView::from(rx.borrow_and_update().clone());
        let event = Event::default().event("session").json_data(&view).ok()?;
        Some((Ok(event), (rx, false)))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// PUT /api/session/resume
pub async fn handle_set_resume(
    State(state): State<AppState>,
    Json(update): Json<BufferUpdate>,
) -> Json<SessionView> {
    state.session.set_resume_text(update.text);
    Json(state.session.snapshot().into())
}

/// PUT /api/session/job-description
pub async fn handle_set_job_description(
    State(state): State<AppState>,
    Json(update): Json<BufferUpdate>,
) -> Json<SessionView> {
    state.session.set_job_description(update.text);
    Json(state.session.snapshot().into())
}

/// POST /api/session/resume-file
///
/// Multipart upload; the `file` field's text replaces the résumé buffer.
pub async fn handle_resume_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SessionView>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?;

        state.session.load_resume_from_file(decode_text(&bytes));
        return Ok(Json(state.session.snapshot().into()));
    }

    Err(AppError::Validation(format!(
        "Upload must include a '{FILE_FIELD}' field"
    )))
}

/// POST /api/session/start
///
/// Runs the analysis on its own task so a dropped connection cannot strand
/// the session in `Analyzing`.
pub async fn handle_start(State(state): State<AppState>) -> Result<Json<StartResponse>, AppError> {
    let session = state.session.clone();
    let outcome = tokio::spawn(async move { session.start().await })
        .await
        .map_err(|e| AppError::Internal(anyhow!("analysis task failed: {e}")))?;

    Ok(Json(StartResponse {
        outcome,
        session: state.session.snapshot().into(),
    }))
}

/// POST /api/session/reset
pub async fn handle_reset(State(state): State<AppState>) -> Json<SessionView> {
    state.session.reset();
    Json(state.session.snapshot().into())
}

/// GET /api/session/summary
///
/// The suggested summary as plain text, for the page's copy button.
pub async fn handle_summary(State(state): State<AppState>) -> Result<String, AppError> {
    state
        .session
        .snapshot()
        .result
        .map(|r| r.suggested_summary)
        .ok_or_else(|| AppError::NotFound("No analysis result to copy from".to_string()))
}

/// Decodes uploaded bytes as UTF-8 text, dropping a leading byte-order mark.
fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
}
