use crate::error::{Error, Result};
use crate::models::insights::{InsightsResult, TestResultSummary};
use crate::services::ai_service::PRIMARY_MODEL;
use crate::services::model_client::{call_with_retry, ModelClient};
use crate::services::rate_limiter::RateLimiter;
use crate::services::response_parser::extract_json_object;
use std::sync::Arc;
use tracing::warn;

const MAX_RETRIES: u32 = 3;

/// Wrong answers beyond this count are left out of the prompt to keep it
/// compact.
const MAX_WRONG_ANSWERS_IN_PROMPT: usize = 3;

/// Turns a completed test into qualitative study feedback. Shares the model
/// rate limiter and retry caller with question generation, but unlike it,
/// this service never fails: any provider or parse problem degrades to a
/// deterministic rule-based result.
#[derive(Clone)]
pub struct InsightsService {
    model: Option<Arc<dyn ModelClient>>,
    limiter: Arc<RateLimiter>,
}

impl InsightsService {
    pub fn new(model: Option<Arc<dyn ModelClient>>, limiter: Arc<RateLimiter>) -> Self {
        Self { model, limiter }
    }

    pub async fn generate_insights(&self, result: &TestResultSummary) -> InsightsResult {
        if let Some(model) = self.model.clone() {
            match self.try_generate(&*model, result).await {
                Ok(insights) => return insights,
                Err(e) => {
                    warn!(error = %e, "AI insights failed, using rule-based fallback");
                }
            }
        }
        fallback_insights(result)
    }

    async fn try_generate(
        &self,
        model: &dyn ModelClient,
        result: &TestResultSummary,
    ) -> Result<InsightsResult> {
        self.limiter.acquire().await;
        let prompt = build_insights_prompt(result);
        let raw = call_with_retry(model, PRIMARY_MODEL, &prompt, MAX_RETRIES).await?;
        let object = extract_json_object(&raw)?;
        let insights: InsightsResult = serde_json::from_value(object)?;
        if insights.overall_performance.trim().is_empty() {
            return Err(Error::Parse(
                "Insights response is missing overallPerformance".to_string(),
            ));
        }
        Ok(insights)
    }
}

fn build_insights_prompt(result: &TestResultSummary) -> String {
    let mut prompt = format!(
        "A student completed a quiz and scored {:.0}% across {} questions.\n",
        result.score_percent, result.total_questions
    );
    if let Some(subject) = result.subject.as_deref().filter(|s| !s.is_empty()) {
        prompt.push_str(&format!("Subject: {}.\n", subject));
    }

    if result.wrong_answers.is_empty() {
        prompt.push_str("Every answer was correct.\n");
    } else {
        prompt.push_str("Questions answered incorrectly:\n");
        for wrong in result.wrong_answers.iter().take(MAX_WRONG_ANSWERS_IN_PROMPT) {
            prompt.push_str(&format!(
                "- Q: {}\n  Their answer: {}\n  Correct answer: {}\n",
                wrong.question, wrong.your_answer, wrong.correct_answer
            ));
        }
    }

    prompt.push_str(
        "\nRespond with a single JSON object and nothing else, with the fields:\n\
         \"overallPerformance\" (string), \"strengths\" (array of strings),\n\
         \"weaknesses\" (array of strings), \"studyRecommendations\" (array of strings),\n\
         \"focusAreas\" (array of strings).\n",
    );
    prompt
}

/// Deterministic feedback derived purely from the score and the wrong-answer
/// count. Infallible so the insights endpoint can promise a result.
fn fallback_insights(result: &TestResultSummary) -> InsightsResult {
    let score = result.score_percent;
    let wrong = result.wrong_answers.len();

    let (overall, strengths) = if score >= 80.0 {
        (
            format!("Excellent work, you scored {:.0}%.", score),
            vec!["Strong grasp of the material overall".to_string()],
        )
    } else if score >= 60.0 {
        (
            format!("Good effort, you scored {:.0}%.", score),
            vec!["Solid understanding of most of the material".to_string()],
        )
    } else if score >= 40.0 {
        (
            format!("You scored {:.0}%, there is room to improve.", score),
            vec!["Some core concepts are already in place".to_string()],
        )
    } else {
        (
            format!("You scored {:.0}%, this topic needs more review.", score),
            vec![],
        )
    };

    let weaknesses = if wrong == 0 {
        vec![]
    } else {
        vec![format!(
            "{} question{} answered incorrectly",
            wrong,
            if wrong == 1 { "" } else { "s" }
        )]
    };

    let focus_areas: Vec<String> = result
        .wrong_answers
        .iter()
        .take(MAX_WRONG_ANSWERS_IN_PROMPT)
        .map(|w| w.question.clone())
        .collect();

    InsightsResult {
        overall_performance: overall,
        strengths,
        weaknesses,
        study_recommendations: vec![
            "Re-read the sections covering the questions you missed".to_string(),
            "Retake the test after reviewing to confirm the gaps are closed".to_string(),
        ],
        focus_areas,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::models::insights::WrongAnswer;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct AlwaysFailingModel {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelClient for AlwaysFailingModel {
        async fn generate(&self, _model: &str, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Provider(ProviderError {
                status: 503,
                message: "unavailable".to_string(),
                retry_delay: None,
            }))
        }
    }

    struct FixedModel(String);

    #[async_trait]
    impl ModelClient for FixedModel {
        async fn generate(&self, _model: &str, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    fn summary(score: f32, wrong: usize) -> TestResultSummary {
        TestResultSummary {
            score_percent: score,
            total_questions: 10,
            wrong_answers: (0..wrong)
                .map(|i| WrongAnswer {
                    question: format!("Question {}", i + 1),
                    your_answer: "False".to_string(),
                    correct_answer: "True".to_string(),
                })
                .collect(),
            subject: None,
            completed_at: None,
        }
    }

    fn limiter() -> Arc<RateLimiter> {
        Arc::new(RateLimiter::new(1000, Duration::ZERO))
    }

    #[tokio::test]
    async fn failing_provider_degrades_to_rule_based_insights() {
        let model = Arc::new(AlwaysFailingModel {
            calls: AtomicUsize::new(0),
        });
        let svc = InsightsService::new(Some(model.clone()), limiter());

        let insights = svc.generate_insights(&summary(70.0, 3)).await;
        assert!(!insights.overall_performance.is_empty());
        assert_eq!(insights.weaknesses, vec!["3 questions answered incorrectly"]);
        assert_eq!(insights.focus_areas.len(), 3);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn uninitialized_service_still_returns_insights() {
        let svc = InsightsService::new(None, limiter());
        let insights = svc.generate_insights(&summary(95.0, 0)).await;
        assert!(insights.overall_performance.contains("95%"));
        assert!(insights.weaknesses.is_empty());
    }

    #[tokio::test]
    async fn model_json_is_parsed_when_well_formed() {
        let raw = r#"```json
        {"overallPerformance": "Great run", "strengths": ["recall"],
         "weaknesses": [], "studyRecommendations": ["keep going"], "focusAreas": []}
        ```"#;
        let svc = InsightsService::new(Some(Arc::new(FixedModel(raw.to_string()))), limiter());
        let insights = svc.generate_insights(&summary(90.0, 1)).await;
        assert_eq!(insights.overall_performance, "Great run");
        assert_eq!(insights.strengths, vec!["recall"]);
    }

    #[tokio::test]
    async fn gibberish_model_output_degrades_to_fallback() {
        let svc = InsightsService::new(
            Some(Arc::new(FixedModel("not json at all".to_string()))),
            limiter(),
        );
        let insights = svc.generate_insights(&summary(30.0, 7)).await;
        assert!(insights.overall_performance.contains("30%"));
        assert!(!insights.study_recommendations.is_empty());
    }
}
