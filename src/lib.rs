pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    ai_service::AiService, flashcard_service::FlashcardService,
    insights_service::InsightsService, model_client::GeminiClient,
    model_client::ModelClient, rate_limiter::RateLimiter, response_cache::ResponseCache,
};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub ai_service: AiService,
    pub insights_service: InsightsService,
    pub flashcard_service: FlashcardService,
    pub cache: Arc<ResponseCache>,
}

impl AppState {
    pub fn new() -> Self {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");

        let model: Option<Arc<dyn ModelClient>> = config
            .gemini_api_key
            .clone()
            .map(|key| Arc::new(GeminiClient::new(key, http_client)) as Arc<dyn ModelClient>);

        let limiter = Arc::new(RateLimiter::new(
            config.requests_per_minute,
            Duration::from_millis(config.min_request_interval_ms),
        ));
        let cache = Arc::new(ResponseCache::new(Duration::from_secs(config.cache_ttl_secs)));

        Self::with_model(model, limiter, cache)
    }

    /// Assembles the service graph around an explicit model client. Tests use
    /// this to inject scripted models; `new` wires up the real Gemini client.
    pub fn with_model(
        model: Option<Arc<dyn ModelClient>>,
        limiter: Arc<RateLimiter>,
        cache: Arc<ResponseCache>,
    ) -> Self {
        let ai_service = AiService::new(model.clone(), limiter.clone(), cache.clone());
        let insights_service = InsightsService::new(model, limiter);
        let flashcard_service = FlashcardService::new();

        Self {
            ai_service,
            insights_service,
            flashcard_service,
            cache,
        }
    }
}
