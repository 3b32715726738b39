pub mod health;
pub mod session;

use axum::{
    response::Html,
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// GET /
async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health::health_handler))
        .route("/api/session", get(session::handle_get_session))
        .route("/api/session/events", get(session::handle_session_events))
        .route("/api/session/resume", put(session::handle_set_resume))
        .route(
            "/api/session/job-description",
            put(session::handle_set_job_description),
        )
        .route(
            "/api/session/resume-file",
            post(session::handle_resume_file),
        )
        .route("/api/session/start", post(session::handle_start))
        .route("/api/session/reset", post(session::handle_reset))
        .route("/api/session/summary", get(session::handle_summary))
        .with_state(state)
}
