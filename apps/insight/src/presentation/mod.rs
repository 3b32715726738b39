//! Presentation — read-only projection of the session into what the page draws.
//!
//! Nothing here feeds back into the session; it only derives view data
//! (gauge geometry, chart rows, citation fallback) from a snapshot.

use std::f64::consts::PI;

use serde::Serialize;

use crate::analysis::models::{AnalysisResult, Source};
use crate::session::SessionState;

/// Bar colours, cycled by row index.
pub const CHART_PALETTE: [&str; 5] = ["#800020", "#a3223f", "#c32f50", "#da4d69", "#ec7c91"];

/// Shown in place of the citation list when the model used no web pages.
pub const NO_SOURCES_NOTE: &str = "Direct AI analysis without web links.";

const GAUGE_RADIUS: f64 = 35.0;

/// One circular score gauge. The ring is an SVG circle whose stroke is
/// dashed to `circumference` and offset by `dash_offset`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreGauge {
    pub label: &'static str,
    pub score: u8,
    pub radius: f64,
    pub circumference: f64,
    pub dash_offset: f64,
}

impl ScoreGauge {
    fn new(label: &'static str, score: u8) -> Self {
        let circumference = 2.0 * PI * GAUGE_RADIUS;
        Self {
            label,
            score,
            radius: GAUGE_RADIUS,
            circumference,
            dash_offset: circumference - (f64::from(score) / 100.0) * circumference,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartRow {
    pub name: String,
    pub importance: f64,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub gauges: Vec<ScoreGauge>,
    pub skill_chart: Vec<ChartRow>,
    pub sources: Vec<Source>,
    pub sources_note: Option<&'static str>,
}

impl DashboardView {
    pub fn from_result(result: &AnalysisResult) -> Self {
        let gauges = vec![
            ScoreGauge::new("Match Rank", result.overall_score),
            ScoreGauge::new("ATS Score", result.ats_compatibility),
            ScoreGauge::new("Keywords", result.keyword_match),
            ScoreGauge::new("Format", result.formatting_score),
        ];

        let skill_chart = result
            .skill_gaps
            .iter()
            .enumerate()
            .map(|(i, gap)| ChartRow {
                name: gap.skill.clone(),
                importance: gap.importance,
                color: CHART_PALETTE[i % CHART_PALETTE.len()],
            })
            .collect();

        Self {
            gauges,
            skill_chart,
            sources: result.sources.clone(),
            sources_note: result.sources.is_empty().then_some(NO_SOURCES_NOTE),
        }
    }
}

/// A snapshot plus everything derived from it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[serde(flatten)]
    pub state: SessionState,
    /// Mirrors the page's button: both buffers filled and nothing in flight.
    pub can_start: bool,
    pub dashboard: Option<DashboardView>,
}

impl From<SessionState> for SessionView {
    fn from(state: SessionState) -> Self {
        let can_start = !state.is_busy()
            && !state.resume_text.is_empty()
            && !state.job_description.is_empty();
        let dashboard = state.result.as_ref().map(DashboardView::from_result);
        Self {
            state,
            can_start,
            dashboard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::models::{MarketInsights, SkillGap};
    use crate::session::Phase;

    fn result_with(skill_gaps: Vec<SkillGap>, sources: Vec<Source>) -> AnalysisResult {
        AnalysisResult {
            overall_score: 72,
            ats_compatibility: 100,
            keyword_match: 0,
            formatting_score: 50,
            strengths: vec![],
            weaknesses: vec![],
            missing_keywords: vec![],
            formatting_suggestions: vec![],
            impact_phrases: vec![],
            suggested_summary: "Summary".to_string(),
            skill_gaps,
            market_insights: MarketInsights {
                trends: vec![],
                salary_range: "n/a".to_string(),
                growth_outlook: "n/a".to_string(),
            },
            sources,
        }
    }

    fn gap(skill: &str, importance: f64) -> SkillGap {
        SkillGap {
            skill: skill.to_string(),
            importance,
        }
    }

    #[test]
    fn test_gauges_follow_score_order_and_ring_geometry() {
        let view = DashboardView::from_result(&result_with(vec![], vec![]));
        let labels: Vec<_> = view.gauges.iter().map(|g| g.label).collect();
        assert_eq!(labels, vec!["Match Rank", "ATS Score", "Keywords", "Format"]);

        let full = &view.gauges[1];
        assert!(full.dash_offset.abs() < 1e-9);
        let empty = &view.gauges[2];
        assert!((empty.dash_offset - empty.circumference).abs() < 1e-9);
        let half = &view.gauges[3];
        assert!((half.dash_offset - half.circumference / 2.0).abs() < 1e-9);
        assert!((half.circumference - 2.0 * PI * 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_chart_rows_keep_order_and_cycle_palette() {
        let gaps: Vec<_> = (0..7).map(|i| gap(&format!("skill{i}"), 90.0 - i as f64)).collect();
        let view = DashboardView::from_result(&result_with(gaps, vec![]));

        assert_eq!(view.skill_chart.len(), 7);
        assert_eq!(view.skill_chart[0].name, "skill0");
        assert!((view.skill_chart[0].importance - 90.0).abs() < f64::EPSILON);
        assert_eq!(view.skill_chart[0].color, CHART_PALETTE[0]);
        assert_eq!(view.skill_chart[5].color, CHART_PALETTE[0]);
        assert_eq!(view.skill_chart[6].color, CHART_PALETTE[1]);
    }

    #[test]
    fn test_sources_note_only_when_no_sources() {
        let none = DashboardView::from_result(&result_with(vec![], vec![]));
        assert_eq!(none.sources_note, Some(NO_SOURCES_NOTE));

        let cited = DashboardView::from_result(&result_with(
            vec![],
            vec![Source {
                title: "t".to_string(),
                url: "https://example.com".to_string(),
            }],
        ));
        assert!(cited.sources_note.is_none());
        assert_eq!(cited.sources.len(), 1);
    }

    #[test]
    fn test_session_view_can_start_needs_both_buffers() {
        let mut state = SessionState::default();
        state.resume_text = "resume".to_string();
        assert!(!SessionView::from(state.clone()).can_start);

        state.job_description = "job".to_string();
        assert!(SessionView::from(state.clone()).can_start);

        state.phase = Phase::Analyzing;
        assert!(!SessionView::from(state).can_start);
    }

    #[test]
    fn test_session_view_flattens_state_fields() {
        let view = SessionView::from(SessionState::default());
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["phase"], "Idle");
        assert!(value["result"].is_null());
        assert!(value["errorMessage"].is_null());
        assert!(value["dashboard"].is_null());
        assert_eq!(value["canStart"], false);
        assert!(value.get("epoch").is_none());
    }
}
