use crate::models::question::{Difficulty, QuestionType};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One generation request: free-form study notes plus the knobs the prompt
/// builder encodes. Consumed once per call; never persisted here.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTestPayload {
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,
    pub difficulty: Difficulty,
    #[validate(range(min = 1, message = "questionCount must be at least 1"))]
    pub question_count: u32,
    #[validate(length(min = 1, message = "at least one question type is required"))]
    pub question_types: Vec<QuestionType>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub focus: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FlashcardsPayload {
    #[validate(length(min = 1, message = "content must not be empty"))]
    pub content: String,
    #[validate(range(min = 1, message = "count must be at least 1"))]
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashcardsResponse {
    pub flashcards: Vec<Flashcard>,
}
