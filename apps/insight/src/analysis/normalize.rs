//! Response normalization — turns the model's JSON text into an `AnalysisResult`.
//!
//! Rules:
//! - scores and importances accept integers, floats and numeric strings,
//!   then clamp to [0, 100]; scores round to the nearest integer
//! - a missing or non-numeric number is an error, never a default
//! - absent or null string lists become empty lists
//! - `suggestedSummary`, `marketInsights.salaryRange` and
//!   `marketInsights.growthOutlook` are required
//! - impact phrases with a blank `original` are dropped; everything else in
//!   the payload passes through as returned
//! - sources: web citations first, then payload sources whose URL was not cited

use std::collections::HashSet;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::analysis::models::{
    AnalysisResult, ImpactPhrase, MarketInsights, SkillGap, Source,
};
use crate::llm_client::{extract_json_object, Citation};

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("response is not valid analysis JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response is missing required field '{0}'")]
    MissingField(String),

    #[error("field '{field}' is not numeric: {value}")]
    NotNumeric { field: String, value: String },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawNumber {
    fn as_f64(&self) -> Option<f64> {
        match self {
            RawNumber::Int(i) => Some(*i as f64),
            RawNumber::Float(f) => Some(*f).filter(|f| f.is_finite()),
            RawNumber::Text(s) => s
                .trim()
                .trim_end_matches('%')
                .trim_end()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite()),
        }
    }

    fn describe(&self) -> String {
        match self {
            RawNumber::Int(i) => i.to_string(),
            RawNumber::Float(f) => f.to_string(),
            RawNumber::Text(s) => format!("\"{s}\""),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnalysis {
    overall_score: Option<RawNumber>,
    ats_compatibility: Option<RawNumber>,
    keyword_match: Option<RawNumber>,
    formatting_score: Option<RawNumber>,
    strengths: Option<Vec<String>>,
    weaknesses: Option<Vec<String>>,
    missing_keywords: Option<Vec<String>>,
    formatting_suggestions: Option<Vec<String>>,
    impact_phrases: Option<Vec<RawImpactPhrase>>,
    suggested_summary: Option<String>,
    skill_gaps: Option<Vec<RawSkillGap>>,
    market_insights: Option<RawMarketInsights>,
    sources: Option<Vec<RawSource>>,
}

#[derive(Debug, Deserialize)]
struct RawImpactPhrase {
    original: Option<String>,
    improved: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSkillGap {
    skill: Option<String>,
    importance: Option<RawNumber>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMarketInsights {
    trends: Option<Vec<String>>,
    salary_range: Option<String>,
    growth_outlook: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    title: Option<String>,
    url: Option<String>,
}

/// Parses model output into a normalized `AnalysisResult`.
pub fn parse_analysis(text: &str, citations: &[Citation]) -> Result<AnalysisResult, NormalizeError> {
    let raw: RawAnalysis = serde_json::from_str(extract_json_object(text))?;
    normalize(raw, citations)
}

fn normalize(raw: RawAnalysis, citations: &[Citation]) -> Result<AnalysisResult, NormalizeError> {
    let market = raw
        .market_insights
        .ok_or_else(|| NormalizeError::MissingField("marketInsights".to_string()))?;

    let impact_phrases = normalize_impact_phrases(raw.impact_phrases.unwrap_or_default());
    let skill_gaps = normalize_skill_gaps(raw.skill_gaps.unwrap_or_default())?;

    Ok(AnalysisResult {
        overall_score: score("overallScore", raw.overall_score)?,
        ats_compatibility: score("atsCompatibility", raw.ats_compatibility)?,
        keyword_match: score("keywordMatch", raw.keyword_match)?,
        formatting_score: score("formattingScore", raw.formatting_score)?,
        strengths: raw.strengths.unwrap_or_default(),
        weaknesses: raw.weaknesses.unwrap_or_default(),
        missing_keywords: raw.missing_keywords.unwrap_or_default(),
        formatting_suggestions: raw.formatting_suggestions.unwrap_or_default(),
        impact_phrases,
        suggested_summary: required("suggestedSummary", raw.suggested_summary)?,
        skill_gaps,
        market_insights: MarketInsights {
            trends: market.trends.unwrap_or_default(),
            salary_range: required("marketInsights.salaryRange", market.salary_range)?,
            growth_outlook: required("marketInsights.growthOutlook", market.growth_outlook)?,
        },
        sources: merge_sources(citations, raw.sources.unwrap_or_default()),
    })
}

fn required(field: &str, value: Option<String>) -> Result<String, NormalizeError> {
    value.ok_or_else(|| NormalizeError::MissingField(field.to_string()))
}

/// Coerces a raw number and clamps it to the 0–100 scale.
fn percent(field: &str, raw: Option<RawNumber>) -> Result<f64, NormalizeError> {
    let raw = raw.ok_or_else(|| NormalizeError::MissingField(field.to_string()))?;
    let value = raw.as_f64().ok_or_else(|| NormalizeError::NotNumeric {
        field: field.to_string(),
        value: raw.describe(),
    })?;
    Ok(value.clamp(0.0, 100.0))
}

fn score(field: &str, raw: Option<RawNumber>) -> Result<u8, NormalizeError> {
    // clamped to [0, 100] so the cast cannot truncate
    Ok(percent(field, raw)?.round() as u8)
}

fn normalize_impact_phrases(raw: Vec<RawImpactPhrase>) -> Vec<ImpactPhrase> {
    let total = raw.len();
    let phrases: Vec<ImpactPhrase> = raw
        .into_iter()
        .filter_map(|p| {
            let original = p.original.filter(|o| !o.trim().is_empty())?;
            Some(ImpactPhrase {
                original,
                improved: p.improved.unwrap_or_default(),
            })
        })
        .collect();

    if phrases.len() < total {
        debug!(
            "Dropped {} impact phrase(s) with no original text",
            total - phrases.len()
        );
    }
    phrases
}

fn normalize_skill_gaps(raw: Vec<RawSkillGap>) -> Result<Vec<SkillGap>, NormalizeError> {
    let mut gaps = Vec::with_capacity(raw.len());
    for (i, gap) in raw.into_iter().enumerate() {
        let skill = required(&format!("skillGaps[{i}].skill"), gap.skill)?;
        let importance = percent(&format!("skillGaps[{i}].importance"), gap.importance)?;
        gaps.push(SkillGap { skill, importance });
    }
    Ok(gaps)
}

/// Citations (already unique) first, then payload sources in their own order.
/// A payload entry is skipped only when a citation already carries its URL.
fn merge_sources(citations: &[Citation], payload: Vec<RawSource>) -> Vec<Source> {
    let mut sources: Vec<Source> = citations
        .iter()
        .filter_map(|c| source(Some(c.title.clone()), Some(c.url.clone())))
        .collect();
    let cited: HashSet<String> = sources.iter().map(|s| s.url.clone()).collect();

    sources.extend(
        payload
            .into_iter()
            .filter_map(|s| source(s.title, s.url))
            .filter(|s| !cited.contains(&s.url)),
    );
    sources
}

fn source(title: Option<String>, url: Option<String>) -> Option<Source> {
    let url = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())?;
    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| url.clone());
    Some(Source { title, url })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = r#"{
        "overallScore": 72,
        "atsCompatibility": 81,
        "keywordMatch": 64,
        "formattingScore": 90,
        "strengths": ["Five years of Go in production", "Distributed systems background"],
        "weaknesses": ["No Rust experience listed"],
        "missingKeywords": ["Rust", "tokio"],
        "formattingSuggestions": ["Move skills above experience"],
        "impactPhrases": [
            {"original": "Worked on backend services", "improved": "Built Go services handling 20k rps"}
        ],
        "suggestedSummary": "Backend engineer with five years of Go.",
        "skillGaps": [
            {"skill": "Rust", "importance": 90},
            {"skill": "Async runtimes", "importance": 55.5}
        ],
        "marketInsights": {
            "trends": ["Rust adoption in infrastructure"],
            "salaryRange": "$160k - $210k",
            "growthOutlook": "Strong"
        },
        "sources": [{"title": "Survey", "url": "https://example.com/survey"}]
    }"#;

    #[test]
    fn test_well_formed_response_is_reproduced() {
        let result = parse_analysis(WELL_FORMED, &[]).unwrap();

        assert_eq!(result.overall_score, 72);
        assert_eq!(result.ats_compatibility, 81);
        assert_eq!(result.keyword_match, 64);
        assert_eq!(result.formatting_score, 90);
        assert_eq!(
            result.strengths,
            vec!["Five years of Go in production", "Distributed systems background"]
        );
        assert_eq!(result.weaknesses, vec!["No Rust experience listed"]);
        assert_eq!(result.missing_keywords, vec!["Rust", "tokio"]);
        assert_eq!(result.formatting_suggestions, vec!["Move skills above experience"]);
        assert_eq!(
            result.impact_phrases,
            vec![ImpactPhrase {
                original: "Worked on backend services".to_string(),
                improved: "Built Go services handling 20k rps".to_string(),
            }]
        );
        assert_eq!(result.suggested_summary, "Backend engineer with five years of Go.");
        assert_eq!(result.skill_gaps.len(), 2);
        assert_eq!(result.skill_gaps[0].skill, "Rust");
        assert!((result.skill_gaps[0].importance - 90.0).abs() < f64::EPSILON);
        assert!((result.skill_gaps[1].importance - 55.5).abs() < f64::EPSILON);
        assert_eq!(result.market_insights.trends, vec!["Rust adoption in infrastructure"]);
        assert_eq!(result.market_insights.salary_range, "$160k - $210k");
        assert_eq!(result.market_insights.growth_outlook, "Strong");
        assert_eq!(
            result.sources,
            vec![Source {
                title: "Survey".to_string(),
                url: "https://example.com/survey".to_string(),
            }]
        );
    }

    #[test]
    fn test_out_of_range_numbers_are_clamped() {
        let json = r#"{
            "overallScore": -20,
            "atsCompatibility": 250,
            "keywordMatch": 100.4,
            "formattingScore": "87%",
            "suggestedSummary": "s",
            "skillGaps": [{"skill": "Rust", "importance": 400}, {"skill": "Go", "importance": -1.5}],
            "marketInsights": {"salaryRange": "n/a", "growthOutlook": "flat"}
        }"#;

        let result = parse_analysis(json, &[]).unwrap();
        assert_eq!(result.overall_score, 0);
        assert_eq!(result.ats_compatibility, 100);
        assert_eq!(result.keyword_match, 100);
        assert_eq!(result.formatting_score, 87);
        assert!((result.skill_gaps[0].importance - 100.0).abs() < f64::EPSILON);
        assert!(result.skill_gaps[1].importance.abs() < f64::EPSILON);
    }

    #[test]
    fn test_absent_and_null_lists_become_empty() {
        let json = r#"{
            "overallScore": 50, "atsCompatibility": 50, "keywordMatch": 50, "formattingScore": 50,
            "strengths": null,
            "suggestedSummary": "s",
            "marketInsights": {"trends": null, "salaryRange": "n/a", "growthOutlook": "flat"}
        }"#;

        let result = parse_analysis(json, &[]).unwrap();
        assert!(result.strengths.is_empty());
        assert!(result.weaknesses.is_empty());
        assert!(result.missing_keywords.is_empty());
        assert!(result.formatting_suggestions.is_empty());
        assert!(result.impact_phrases.is_empty());
        assert!(result.skill_gaps.is_empty());
        assert!(result.market_insights.trends.is_empty());
        assert!(result.sources.is_empty());
    }

    #[test]
    fn test_missing_score_is_rejected() {
        let json = r#"{
            "atsCompatibility": 50, "keywordMatch": 50, "formattingScore": 50,
            "suggestedSummary": "s",
            "marketInsights": {"salaryRange": "n/a", "growthOutlook": "flat"}
        }"#;

        let err = parse_analysis(json, &[]).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingField(ref f) if f == "overallScore"));
    }

    #[test]
    fn test_non_numeric_score_is_rejected() {
        let json = r#"{
            "overallScore": "excellent", "atsCompatibility": 50, "keywordMatch": 50, "formattingScore": 50,
            "suggestedSummary": "s",
            "marketInsights": {"salaryRange": "n/a", "growthOutlook": "flat"}
        }"#;

        let err = parse_analysis(json, &[]).unwrap_err();
        assert!(matches!(err, NormalizeError::NotNumeric { ref field, .. } if field == "overallScore"));
    }

    #[test]
    fn test_boolean_score_fails_to_parse() {
        let json = r#"{"overallScore": true}"#;
        assert!(matches!(
            parse_analysis(json, &[]).unwrap_err(),
            NormalizeError::Json(_)
        ));
    }

    #[test]
    fn test_missing_summary_and_market_strings_are_rejected() {
        let no_summary = r#"{
            "overallScore": 1, "atsCompatibility": 1, "keywordMatch": 1, "formattingScore": 1,
            "marketInsights": {"salaryRange": "n/a", "growthOutlook": "flat"}
        }"#;
        assert!(parse_analysis(no_summary, &[]).is_err());

        let no_salary = r#"{
            "overallScore": 1, "atsCompatibility": 1, "keywordMatch": 1, "formattingScore": 1,
            "suggestedSummary": "s",
            "marketInsights": {"growthOutlook": "flat"}
        }"#;
        let err = parse_analysis(no_salary, &[]).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingField(ref f) if f == "marketInsights.salaryRange"));
    }

    #[test]
    fn test_skill_gap_without_importance_is_rejected() {
        let json = r#"{
            "overallScore": 1, "atsCompatibility": 1, "keywordMatch": 1, "formattingScore": 1,
            "suggestedSummary": "s",
            "skillGaps": [{"skill": "Rust"}],
            "marketInsights": {"salaryRange": "n/a", "growthOutlook": "flat"}
        }"#;
        let err = parse_analysis(json, &[]).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingField(ref f) if f == "skillGaps[0].importance"));
    }

    #[test]
    fn test_impact_phrases_without_original_are_dropped() {
        let json = r#"{
            "overallScore": 1, "atsCompatibility": 1, "keywordMatch": 1, "formattingScore": 1,
            "suggestedSummary": "s",
            "impactPhrases": [
                {"original": "  ", "improved": "Shipped X"},
                {"improved": "Shipped Y"},
                {"original": "Did Z", "improved": "Delivered Z two weeks early"}
            ],
            "marketInsights": {"salaryRange": "n/a", "growthOutlook": "flat"}
        }"#;
        let result = parse_analysis(json, &[]).unwrap();
        assert_eq!(result.impact_phrases.len(), 1);
        assert_eq!(result.impact_phrases[0].original, "Did Z");
    }

    #[test]
    fn test_sparse_but_valid_entries_are_kept() {
        let json = r#"{
            "overallScore": 1, "atsCompatibility": 1, "keywordMatch": 1, "formattingScore": 1,
            "suggestedSummary": "s",
            "impactPhrases": [{"original": "Led team", "improved": ""}],
            "skillGaps": [{"skill": "", "importance": 50}],
            "marketInsights": {"salaryRange": "n/a", "growthOutlook": "flat"},
            "sources": [
                {"title": "Report", "url": "https://e.com"},
                {"title": "Report, page 2", "url": "https://e.com"}
            ]
        }"#;

        let result = parse_analysis(json, &[]).unwrap();
        assert_eq!(
            result.impact_phrases,
            vec![ImpactPhrase {
                original: "Led team".to_string(),
                improved: String::new(),
            }]
        );
        assert_eq!(result.skill_gaps.len(), 1);
        assert_eq!(result.skill_gaps[0].skill, "");
        assert!((result.skill_gaps[0].importance - 50.0).abs() < f64::EPSILON);
        assert_eq!(result.sources.len(), 2);
        assert_eq!(result.sources[1].title, "Report, page 2");
    }

    #[test]
    fn test_skill_gap_without_skill_is_rejected() {
        let json = r#"{
            "overallScore": 1, "atsCompatibility": 1, "keywordMatch": 1, "formattingScore": 1,
            "suggestedSummary": "s",
            "skillGaps": [{"importance": 10}],
            "marketInsights": {"salaryRange": "n/a", "growthOutlook": "flat"}
        }"#;
        let err = parse_analysis(json, &[]).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingField(ref f) if f == "skillGaps[0].skill"));
    }

    #[test]
    fn test_fenced_response_parses() {
        let fenced = format!("```json\n{WELL_FORMED}\n```");
        assert_eq!(parse_analysis(&fenced, &[]).unwrap().overall_score, 72);
    }

    #[test]
    fn test_citations_lead_and_cited_payload_urls_are_skipped() {
        let citations = vec![Citation {
            title: "Levels report".to_string(),
            url: "https://example.com/levels".to_string(),
        }];
        let payload = vec![
            RawSource {
                title: Some("Levels again".to_string()),
                url: Some("https://example.com/levels".to_string()),
            },
            RawSource {
                title: None,
                url: Some("https://example.com/blog".to_string()),
            },
            RawSource {
                title: Some("No link".to_string()),
                url: Some(" ".to_string()),
            },
        ];

        let sources = merge_sources(&citations, payload);
        assert_eq!(
            sources,
            vec![
                Source {
                    title: "Levels report".to_string(),
                    url: "https://example.com/levels".to_string(),
                },
                Source {
                    title: "https://example.com/blog".to_string(),
                    url: "https://example.com/blog".to_string(),
                },
            ]
        );
    }
}
