use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Completed-test summary posted by the caller. Persistence of attempts is
/// owned elsewhere; this is only the slice the insights prompt needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultSummary {
    pub score_percent: f32,
    pub total_questions: u32,
    #[serde(default)]
    pub wrong_answers: Vec<WrongAnswer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrongAnswer {
    pub question: String,
    pub your_answer: String,
    pub correct_answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsResult {
    #[serde(default)]
    pub overall_performance: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub study_recommendations: Vec<String>,
    #[serde(default)]
    pub focus_areas: Vec<String>,
}
