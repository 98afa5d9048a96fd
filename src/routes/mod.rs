pub mod health;

use crate::AppState;
use axum::routing::{get, post};
use axum::Router;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/tests/generate", post(tests::generate_test))
        .route("/api/tests/flashcards", post(tests::generate_flashcards))
        .route("/api/tests/:test_id/insights", post(tests::generate_insights))
}
