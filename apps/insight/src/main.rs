mod analysis;
mod config;
mod errors;
mod llm_client;
mod presentation;
mod routes;
mod session;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::client::AnalysisClient;
use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::session::controller::SessionController;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed values, not on a missing API key)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ResumeInsight v{}", env!("CARGO_PKG_VERSION"));

    if config.anthropic_api_key.is_none() {
        warn!("ANTHROPIC_API_KEY is not set; analyses will fail until it is configured");
    }

    // Initialize LLM client
    let llm = LlmClient::new(
        config.anthropic_api_key.clone(),
        config.analysis_timeout,
        config.enable_web_search,
    )
    .context("Failed to build HTTP client")?;
    info!(
        "LLM client initialized (model: {}, timeout: {}s, web search: {})",
        llm_client::MODEL,
        config.analysis_timeout.as_secs(),
        llm.web_search_enabled()
    );

    let analysis = Arc::new(AnalysisClient::new(
        Arc::new(llm),
        config.enable_web_search,
    ));

    // Build app state
    let state = AppState {
        session: Arc::new(SessionController::new(analysis)),
        web_search: config.enable_web_search,
    };

    // Build router
    let app = build_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("HOST '{}' is not a valid IP address", config.host))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Open http://{addr} in your browser");

    axum::serve(listener, app).await?;

    Ok(())
}
