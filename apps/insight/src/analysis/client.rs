//! Analysis Client — sends a validated request to the model and returns a
//! normalized `AnalysisResult`.
//!
//! `AnalysisService` is the seam the session controller depends on, so the
//! controller can be driven by an in-memory fake in tests.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::analysis::models::{AnalysisRequest, AnalysisResult};
use crate::analysis::normalize::parse_analysis;
use crate::analysis::prompts::{build_analysis_prompt, system_prompt};
use crate::analysis::AnalysisError;
use crate::llm_client::CompletionBackend;

#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError>;
}

/// Model-backed implementation of `AnalysisService`.
pub struct AnalysisClient {
    backend: Arc<dyn CompletionBackend>,
    web_search: bool,
}

impl AnalysisClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, web_search: bool) -> Self {
        Self {
            backend,
            web_search,
        }
    }
}

#[async_trait]
impl AnalysisService for AnalysisClient {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let prompt = build_analysis_prompt(request, self.web_search);
        let completion = self.backend.complete(&prompt, &system_prompt()).await?;

        let result = parse_analysis(&completion.text, &completion.citations).map_err(|e| {
            warn!("Discarding unparseable analysis response: {e}");
            AnalysisError::from(e)
        })?;

        info!(
            "Analysis parsed: overall={}, skill_gaps={}, sources={}",
            result.overall_score,
            result.skill_gaps.len(),
            result.sources.len()
        );

        Ok(result)
    }
}
