use std::sync::Arc;

use crate::session::controller::SessionController;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The one analysis session this process serves.
    pub session: Arc<SessionController>,
    /// Reported by the health endpoint.
    pub web_search: bool,
}
