// All LLM prompt constants for the Analysis module.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::analysis::models::AnalysisRequest;
use crate::llm_client::prompts::{JSON_ONLY_SYSTEM, PERCENT_SCALE_INSTRUCTION};

/// Role half of the system prompt; the JSON-only rules are appended by [`system_prompt`].
const ANALYSIS_ROLE: &str = "You are a senior technical recruiter and ATS (applicant tracking system) \
    specialist. You compare a candidate's resume against a target job description and \
    produce an honest, specific evaluation.";

/// Exact output schema the model must follow.
const ANALYSIS_SCHEMA: &str = r#"Compare the resume with the job description and return a JSON object with this EXACT schema (no extra fields, every field present):
{
  "overallScore": 72,
  "atsCompatibility": 80,
  "keywordMatch": 65,
  "formattingScore": 85,
  "strengths": ["Concrete strength tied to the job"],
  "weaknesses": ["Concrete weakness relative to the job"],
  "missingKeywords": ["Keyword from the job description absent in the resume"],
  "formattingSuggestions": ["Actionable formatting fix"],
  "impactPhrases": [
    {"original": "Exact phrase copied from the resume", "improved": "Quantified, outcome-focused rewrite"}
  ],
  "suggestedSummary": "A three to four sentence professional summary tailored to this job.",
  "skillGaps": [
    {"skill": "Skill the job needs", "importance": 90}
  ],
  "marketInsights": {
    "trends": ["Current hiring trend relevant to this role"],
    "salaryRange": "Estimated salary range for this role and seniority",
    "growthOutlook": "One-line outlook for demand in this role"
  },
  "sources": [
    {"title": "Page title", "url": "https://..."}
  ]
}

Rules:
- overallScore: how well the candidate fits the role overall.
- atsCompatibility: how well an ATS would parse and rank this resume for this job.
- keywordMatch: share of the job's important keywords present in the resume.
- formattingScore: clarity, structure and scannability of the resume.
- impactPhrases.original MUST be copied verbatim from the resume and never empty.
- skillGaps: order by importance, highest first.
- Leave "sources" as an empty array if you did not consult any web pages."#;

const WEB_GROUNDING_INSTRUCTION: &str = "\
    Use web search to ground marketInsights (salary range, hiring trends, outlook) in \
    current data, and list every page you relied on in \"sources\".";

const KNOWLEDGE_ONLY_INSTRUCTION: &str = "\
    Base marketInsights on your own knowledge and leave \"sources\" empty.";

/// Full system prompt for analysis calls.
pub fn system_prompt() -> String {
    format!("{} {}", ANALYSIS_ROLE, JSON_ONLY_SYSTEM)
}

/// Builds the user prompt. Inputs are appended last and delimited by tags so
/// braces or placeholders inside them are never interpreted.
pub fn build_analysis_prompt(request: &AnalysisRequest, web_search: bool) -> String {
    let grounding = if web_search {
        WEB_GROUNDING_INSTRUCTION
    } else {
        KNOWLEDGE_ONLY_INSTRUCTION
    };

    format!(
        "{}\n\n{}\n{}\n\n<resume>\n{}\n</resume>\n\n<job_description>\n{}\n</job_description>",
        ANALYSIS_SCHEMA,
        grounding,
        PERCENT_SCALE_INSTRUCTION,
        request.resume_text(),
        request.job_description(),
    )
}
