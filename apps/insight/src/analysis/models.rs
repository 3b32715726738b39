use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisError;

/// Shown inline when either input buffer is blank.
pub const MISSING_INPUT_MESSAGE: &str = "Please provide both your resume and the job description.";

/// A validated pair of inputs. The only way to build one is through
/// [`AnalysisRequest::new`], so holding one proves both texts are non-blank.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    resume_text: String,
    job_description: String,
}

impl AnalysisRequest {
    pub fn new(
        resume_text: impl Into<String>,
        job_description: impl Into<String>,
    ) -> Result<Self, AnalysisError> {
        let resume_text = resume_text.into();
        let job_description = job_description.into();

        if resume_text.trim().is_empty() || job_description.trim().is_empty() {
            return Err(AnalysisError::Validation(MISSING_INPUT_MESSAGE.to_string()));
        }

        Ok(Self {
            resume_text,
            job_description,
        })
    }

    pub fn resume_text(&self) -> &str {
        &self.resume_text
    }

    pub fn job_description(&self) -> &str {
        &self.job_description
    }
}

/// The structured evaluation returned by the model, after normalization.
///
/// Field names serialize in camelCase; the browser page reads them as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub overall_score: u8,
    pub ats_compatibility: u8,
    pub keyword_match: u8,
    pub formatting_score: u8,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub formatting_suggestions: Vec<String>,
    pub impact_phrases: Vec<ImpactPhrase>,
    pub suggested_summary: String,
    pub skill_gaps: Vec<SkillGap>,
    pub market_insights: MarketInsights,
    /// Empty when the model did no web-grounded retrieval.
    #[serde(default)]
    pub sources: Vec<Source>,
}

/// A suggested rewrite of one résumé phrase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactPhrase {
    pub original: String,
    pub improved: String,
}

/// A skill the job asks for that the résumé lacks.
/// `importance` ranks gaps within one response only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillGap {
    pub skill: String,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketInsights {
    pub trends: Vec<String>,
    pub salary_range: String,
    pub growth_outlook: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    pub url: String,
}
