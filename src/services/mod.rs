pub mod ai_service;
pub mod flashcard_service;
pub mod insights_service;
pub mod model_client;
pub mod post_processor;
pub mod rate_limiter;
pub mod response_cache;
pub mod response_parser;
