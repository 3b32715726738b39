// Analysis: validated request → model call → normalized AnalysisResult.
// All LLM calls go through llm_client — no direct Anthropic calls here.

pub mod client;
pub mod models;
pub mod normalize;
pub mod prompts;

use thiserror::Error;

use crate::analysis::normalize::NormalizeError;
use crate::llm_client::LlmError;

/// Failure of one analysis attempt.
///
/// `Validation` is raised before any network call and never reaches the
/// session's `Failed` phase. `Service` covers everything after that point.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Service(String),
}

impl From<LlmError> for AnalysisError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::MissingApiKey => AnalysisError::Service(
                "Analysis failed: no API key configured. Set ANTHROPIC_API_KEY in the .env file."
                    .to_string(),
            ),
            LlmError::Api { status: 401, .. } | LlmError::Api { status: 403, .. } => {
                AnalysisError::Service(
                    "Analysis failed: the API key was rejected. Check ANTHROPIC_API_KEY in the .env file."
                        .to_string(),
                )
            }
            LlmError::Http(ref err) if err.is_timeout() => AnalysisError::Service(
                "Analysis failed: the analysis service timed out.".to_string(),
            ),
            other => AnalysisError::Service(format!("Analysis failed: {other}")),
        }
    }
}

impl From<NormalizeError> for AnalysisError {
    fn from(e: NormalizeError) -> Self {
        AnalysisError::Service(format!(
            "Analysis failed: the analysis service returned an unusable response ({e})"
        ))
    }
}
