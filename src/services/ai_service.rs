use crate::dto::test_dto::GenerateTestPayload;
use crate::error::{Error, Result};
use crate::models::question::{GenerationResponse, QuestionType};
use crate::services::model_client::{call_with_retry, ModelClient};
use crate::services::post_processor;
use crate::services::rate_limiter::RateLimiter;
use crate::services::response_cache::ResponseCache;
use crate::services::response_parser::parse_questions;
use crate::utils::hash::content_hash;
use std::sync::Arc;
use tracing::{info, warn};

/// Default tier: fast and cheap, first try for every request.
pub const PRIMARY_MODEL: &str = "gemini-2.0-flash";
/// Stronger tier, only attempted as a fallback for small requests.
pub const FALLBACK_MODEL: &str = "gemini-1.5-pro";

const MAX_RETRIES: u32 = 3;

/// The fallback model is pricier, so it is gated to requests small enough
/// that a second full attempt stays cheap.
const FALLBACK_MAX_QUESTIONS: u32 = 5;
const FALLBACK_MAX_CONTENT_BYTES: usize = 2000;

/// Character budget for the study material inside the prompt, keeping the
/// request comfortably under the model's token limit.
const MAX_PROMPT_CONTENT_CHARS: usize = 3000;
const TRUNCATION_MARKER: &str = "\n... [content truncated]";

#[derive(Clone)]
pub struct AiService {
    model: Option<Arc<dyn ModelClient>>,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
}

impl AiService {
    pub fn new(
        model: Option<Arc<dyn ModelClient>>,
        limiter: Arc<RateLimiter>,
        cache: Arc<ResponseCache>,
    ) -> Self {
        Self {
            model,
            limiter,
            cache,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.model.is_some()
    }

    /// Generates a question set for the request: cache first (a hit consumes
    /// no rate-limit budget), then the fast model, then, for small requests
    /// only, the strong model. Successful responses are written through to
    /// the cache.
    pub async fn generate_questions(
        &self,
        request: &GenerateTestPayload,
    ) -> Result<GenerationResponse> {
        let Some(model) = self.model.clone() else {
            return Err(Error::Config(
                "GEMINI_API_KEY is not set; AI service is uninitialized".to_string(),
            ));
        };

        let key = content_hash(request);
        if let Some(hit) = self.cache.get(&key) {
            info!(content_hash = %key, "Returning cached generation response");
            return Ok(hit);
        }

        let prompt = build_generation_prompt(request);

        match self.generate_once(&*model, PRIMARY_MODEL, &prompt, request, &key).await {
            Ok(response) => {
                self.cache.put(key, response.clone());
                Ok(response)
            }
            Err(primary_err) if self.fallback_allowed(request) => {
                warn!(
                    error = %primary_err,
                    "Primary model failed, retrying with fallback model"
                );
                match self.generate_once(&*model, FALLBACK_MODEL, &prompt, request, &key).await {
                    Ok(response) => {
                        self.cache.put(key, response.clone());
                        Ok(response)
                    }
                    Err(fallback_err) => Err(Error::generation(
                        "Both primary and fallback models failed to generate questions",
                        fallback_err,
                    )),
                }
            }
            Err(primary_err) => Err(Error::generation(
                "Question generation failed and the request is too large for the fallback model",
                primary_err,
            )),
        }
    }

    async fn generate_once(
        &self,
        model: &dyn ModelClient,
        model_name: &str,
        prompt: &str,
        request: &GenerateTestPayload,
        key: &str,
    ) -> Result<GenerationResponse> {
        self.limiter.acquire().await;
        let raw = call_with_retry(model, model_name, prompt, MAX_RETRIES).await?;
        let raw_questions = parse_questions(&raw)?;
        info!(
            model = model_name,
            received = raw_questions.len(),
            requested = request.question_count,
            "Model returned questions"
        );
        Ok(post_processor::process(&raw_questions, request, key))
    }

    fn fallback_allowed(&self, request: &GenerateTestPayload) -> bool {
        request.question_count <= FALLBACK_MAX_QUESTIONS
            && request.content.len() <= FALLBACK_MAX_CONTENT_BYTES
    }
}

/// Renders the generation prompt: truncated study material plus a strict
/// instruction block so the response parses as one JSON object.
pub fn build_generation_prompt(request: &GenerateTestPayload) -> String {
    let mut content: String = request
        .content
        .chars()
        .take(MAX_PROMPT_CONTENT_CHARS)
        .collect();
    if request.content.chars().count() > MAX_PROMPT_CONTENT_CHARS {
        content.push_str(TRUNCATION_MARKER);
    }

    let types = request
        .question_types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = format!(
        "You are a study assistant that writes quiz questions.\n\n\
         Generate exactly {count} questions from the study material below.\n\
         Question types to use: {types}. Difficulty: {difficulty}.\n",
        count = request.question_count,
        types = types,
        difficulty = request.difficulty.as_str(),
    );
    if let Some(subject) = request.subject.as_deref().filter(|s| !s.is_empty()) {
        prompt.push_str(&format!("Subject: {}.\n", subject));
    }
    if let Some(focus) = request.focus.as_deref().filter(|f| !f.is_empty()) {
        prompt.push_str(&format!("Focus especially on: {}.\n", focus));
    }

    prompt.push_str(
        "\nRules:\n\
         1. Every question must be answerable strictly from the study material. Do not use outside knowledge.\n\
         2. Every question must include a \"sourceText\" field quoting the exact passage of the material that supports the answer.\n\
         3. \"correctAnswer\" must match one of the question's options verbatim.\n",
    );
    if request.question_types.contains(&QuestionType::TrueFalse) {
        prompt.push_str(
            "4. True/false questions must have exactly two options: the literal strings \"True\" and \"False\".\n",
        );
    }
    if request.question_types.contains(&QuestionType::MultipleChoice) {
        prompt.push_str("5. Multiple-choice questions must have exactly four options.\n");
    }

    prompt.push_str(
        "\nRespond with a single JSON object of the form {\"questions\": [...]} and nothing else.\n\
         Each question object has the fields: \"type\", \"question\", \"options\", \"correctAnswer\", \"explanation\", \"sourceText\".\n\
         \nStudy material:\n\"\"\"\n",
    );
    prompt.push_str(&content);
    prompt.push_str("\n\"\"\"\n");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::models::question::Difficulty;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Pops one scripted result per call and remembers which models were hit.
    struct ScriptedModel {
        calls: AtomicUsize,
        models_called: Mutex<Vec<String>>,
        script: Mutex<VecDeque<Result<String>>>,
    }

    impl ScriptedModel {
        fn new(script: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                models_called: Mutex::new(Vec::new()),
                script: Mutex::new(script.into()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn provider_failure() -> Result<String> {
            Err(Error::Provider(ProviderError {
                status: 500,
                message: "model overloaded".to_string(),
                retry_delay: None,
            }))
        }

        fn tf_questions() -> Result<String> {
            Ok(r#"{"questions": [
                {"type": "true-false", "question": "Does photosynthesis convert sunlight?",
                 "options": ["True", "False"], "correctAnswer": "True",
                 "explanation": "Stated directly.",
                 "sourceText": "Photosynthesis converts sunlight into energy"},
                {"type": "true-false", "question": "Do plants use chlorophyll?",
                 "options": ["True", "False"], "correctAnswer": "True",
                 "explanation": "Stated directly.",
                 "sourceText": "Plants use chlorophyll"}
            ]}"#
            .to_string())
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn generate(&self, model: &str, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.models_called.lock().unwrap().push(model.to_string());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Internal("script exhausted".to_string())))
        }
    }

    fn service(model: Arc<ScriptedModel>) -> AiService {
        AiService::new(
            Some(model),
            Arc::new(RateLimiter::new(1000, Duration::ZERO)),
            Arc::new(ResponseCache::new(Duration::from_secs(86_400))),
        )
    }

    fn request(content: &str, count: u32) -> GenerateTestPayload {
        GenerateTestPayload {
            content: content.to_string(),
            difficulty: Difficulty::Easy,
            question_count: count,
            question_types: vec![QuestionType::TrueFalse],
            subject: None,
            focus: None,
        }
    }

    #[tokio::test]
    async fn second_identical_request_is_served_from_cache() {
        let model = ScriptedModel::new(vec![ScriptedModel::tf_questions()]);
        let svc = service(model.clone());
        let req = request("Photosynthesis converts sunlight into energy. Plants use chlorophyll.", 2);

        let first = svc.generate_questions(&req).await.unwrap();
        let second = svc.generate_questions(&req).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn small_requests_fall_back_to_the_strong_model() {
        let model = ScriptedModel::new(vec![
            ScriptedModel::provider_failure(),
            ScriptedModel::tf_questions(),
        ]);
        let svc = service(model.clone());
        let req = request("Photosynthesis converts sunlight into energy. Plants use chlorophyll.", 2);

        let out = svc.generate_questions(&req).await.unwrap();
        assert_eq!(out.questions.len(), 2);
        assert_eq!(
            *model.models_called.lock().unwrap(),
            vec![PRIMARY_MODEL.to_string(), FALLBACK_MODEL.to_string()]
        );
    }

    #[tokio::test]
    async fn large_question_count_skips_the_fallback() {
        let model = ScriptedModel::new(vec![ScriptedModel::provider_failure()]);
        let svc = service(model.clone());
        let req = request("Photosynthesis converts sunlight into energy. Plants use chlorophyll.", 20);

        let err = svc.generate_questions(&req).await.unwrap_err();
        assert!(matches!(err, Error::Generation { .. }));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn large_content_skips_the_fallback() {
        let model = ScriptedModel::new(vec![ScriptedModel::provider_failure()]);
        let svc = service(model.clone());
        let req = request(&"a".repeat(5000), 3);

        let err = svc.generate_questions(&req).await.unwrap_err();
        assert!(matches!(err, Error::Generation { .. }));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn both_paths_failing_escalates_with_the_cause() {
        let model = ScriptedModel::new(vec![
            ScriptedModel::provider_failure(),
            ScriptedModel::provider_failure(),
        ]);
        let svc = service(model.clone());
        let req = request("Photosynthesis converts sunlight into energy. Plants use chlorophyll.", 2);

        let err = svc.generate_questions(&req).await.unwrap_err();
        match err {
            Error::Generation { source, .. } => {
                assert!(matches!(*source, Error::Provider(_)));
            }
            other => panic!("expected Generation error, got {other:?}"),
        }
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn missing_api_key_fails_fast() {
        let svc = AiService::new(
            None,
            Arc::new(RateLimiter::new(1000, Duration::ZERO)),
            Arc::new(ResponseCache::new(Duration::from_secs(60))),
        );
        let err = svc
            .generate_questions(&request("some study notes about biology", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(!svc.is_initialized());
    }

    #[tokio::test]
    async fn unparseable_model_output_is_a_parse_error_for_large_requests() {
        let model = ScriptedModel::new(vec![Ok("the model rambled with no json".to_string())]);
        let svc = service(model);
        let err = svc
            .generate_questions(&request(&"b".repeat(3000), 10))
            .await
            .unwrap_err();
        match err {
            Error::Generation { source, .. } => assert!(matches!(*source, Error::Parse(_))),
            other => panic!("expected Generation error, got {other:?}"),
        }
    }

    #[test]
    fn prompt_truncates_long_content_with_a_marker() {
        let req = request(&"x".repeat(4000), 2);
        let prompt = build_generation_prompt(&req);
        assert!(prompt.contains(TRUNCATION_MARKER.trim_start()));
        assert!(!prompt.contains(&"x".repeat(3001)));
    }

    #[test]
    fn prompt_encodes_count_types_and_conditional_rules() {
        let mut req = request("Photosynthesis converts sunlight into energy for plants.", 4);
        req.question_types = vec![QuestionType::TrueFalse, QuestionType::MultipleChoice];
        req.subject = Some("Biology".to_string());
        req.focus = Some("photosynthesis".to_string());

        let prompt = build_generation_prompt(&req);
        assert!(prompt.contains("Generate exactly 4 questions"));
        assert!(prompt.contains("true-false, mcq"));
        assert!(prompt.contains("Subject: Biology."));
        assert!(prompt.contains("Focus especially on: photosynthesis."));
        assert!(prompt.contains("literal strings \"True\" and \"False\""));
        assert!(prompt.contains("exactly four options"));

        // Rules are conditional on the requested types.
        req.question_types = vec![QuestionType::ShortAnswer];
        let prompt = build_generation_prompt(&req);
        assert!(!prompt.contains("literal strings"));
        assert!(!prompt.contains("exactly four options"));
    }
}
