use crate::dto::test_dto::GenerateTestPayload;
use crate::models::question::{
    CorrectAnswer, GeneratedQuestion, GenerationResponse, QuestionType, ResponseMetadata,
};
use crate::utils::text::{find_ignore_ascii_case, split_sentences};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Placeholder: answers are not cross-verified against the source, so every
/// question carries the same confidence.
pub const DEFAULT_CONFIDENCE: f32 = 0.85;

/// Normalizes raw model question objects into the canonical response shape.
/// Every missing field gets a default, every question gets a real source span
/// into `request.content`, and the list is bounded by the requested count.
pub fn process(
    raw_questions: &[JsonValue],
    request: &GenerateTestPayload,
    content_hash: &str,
) -> GenerationResponse {
    let mut questions: Vec<GeneratedQuestion> = raw_questions
        .iter()
        .enumerate()
        .map(|(i, raw)| normalize_question(raw, i, request))
        .collect();
    questions.truncate(request.question_count as usize);

    let total = questions.len() as u32;
    GenerationResponse {
        questions,
        metadata: ResponseMetadata {
            total_questions: total,
            estimated_time: total * request.difficulty.minutes_per_question(),
            difficulty: request.difficulty,
            subject: request.subject.clone(),
            content_hash: content_hash.to_string(),
        },
    }
}

fn normalize_question(
    raw: &JsonValue,
    index: usize,
    request: &GenerateTestPayload,
) -> GeneratedQuestion {
    let question_type = raw
        .get("type")
        .and_then(|t| t.as_str())
        .and_then(QuestionType::parse)
        .unwrap_or_else(|| infer_type(&request.question_types, index));

    let question_text = raw
        .get("question")
        .or_else(|| raw.get("questionText"))
        .and_then(|q| q.as_str())
        .map(|q| q.to_string())
        .unwrap_or_else(|| format!("Question {}", index + 1));

    let options = normalize_options(raw, question_type);
    let correct_answer = normalize_answer(raw, question_type, &options);

    let explanation = raw
        .get("explanation")
        .and_then(|e| e.as_str())
        .unwrap_or_default()
        .to_string();

    let claimed_source = raw.get("sourceText").and_then(|s| s.as_str());
    let (source_text, source_offset, source_length) =
        attribute_source(&request.content, claimed_source, index);

    GeneratedQuestion {
        id: Uuid::new_v4().to_string(),
        question_type,
        question_text,
        options,
        correct_answer,
        explanation,
        difficulty: request.difficulty,
        points: request.difficulty.points(),
        source_text,
        source_offset,
        source_length,
        confidence: DEFAULT_CONFIDENCE,
    }
}

fn infer_type(requested: &[QuestionType], index: usize) -> QuestionType {
    if requested.is_empty() {
        QuestionType::ShortAnswer
    } else {
        requested[index % requested.len()]
    }
}

fn normalize_options(raw: &JsonValue, question_type: QuestionType) -> Vec<String> {
    // True/false options are the two literal strings regardless of what the
    // model sent; answers are normalized against them below.
    if question_type == QuestionType::TrueFalse {
        return vec!["True".to_string(), "False".to_string()];
    }

    let supplied: Vec<String> = raw
        .get("options")
        .and_then(|o| o.as_array())
        .map(|a| {
            a.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();

    match question_type {
        QuestionType::MultipleChoice if supplied.is_empty() => vec![
            "Option A".to_string(),
            "Option B".to_string(),
            "Option C".to_string(),
            "Option D".to_string(),
        ],
        _ => supplied,
    }
}

fn normalize_answer(
    raw: &JsonValue,
    question_type: QuestionType,
    options: &[String],
) -> CorrectAnswer {
    let raw_answer = raw.get("correctAnswer").or_else(|| raw.get("correct_answer"));

    match question_type {
        QuestionType::TrueFalse => {
            let truthy = raw_answer
                .and_then(|a| a.as_str())
                .map(|a| a.trim().eq_ignore_ascii_case("true"))
                .unwrap_or(true);
            CorrectAnswer::Single(if truthy { "True" } else { "False" }.to_string())
        }
        QuestionType::MultipleChoice => match raw_answer {
            Some(JsonValue::Array(many)) => CorrectAnswer::Multiple(
                many.iter()
                    .filter_map(|v| v.as_str())
                    .map(|a| match_option(a, options))
                    .collect(),
            ),
            Some(JsonValue::String(one)) => CorrectAnswer::Single(match_option(one, options)),
            _ => CorrectAnswer::Single(options.first().cloned().unwrap_or_default()),
        },
        QuestionType::ShortAnswer => CorrectAnswer::Single(
            raw_answer
                .and_then(|a| a.as_str())
                .unwrap_or_default()
                .to_string(),
        ),
    }
}

/// Snaps a claimed answer onto an option's verbatim text; unmatched answers
/// fall back to the first option so single-answer questions always reference
/// a real option.
fn match_option(answer: &str, options: &[String]) -> String {
    options
        .iter()
        .find(|o| o.trim().eq_ignore_ascii_case(answer.trim()))
        .cloned()
        .unwrap_or_else(|| options.first().cloned().unwrap_or_default())
}

/// Locates the model's claimed source quote in the content, or substitutes
/// the index-th usable sentence (clamped) so the offsets always slice real
/// content. The sentence pick is a relevance heuristic, not a guarantee.
fn attribute_source(
    content: &str,
    claimed: Option<&str>,
    index: usize,
) -> (String, usize, usize) {
    if let Some(claim) = claimed.map(str::trim).filter(|c| !c.is_empty()) {
        if let Some(offset) = find_ignore_ascii_case(content, claim) {
            let found = &content[offset..offset + claim.len()];
            return (found.to_string(), offset, claim.len());
        }
    }

    let sentences = split_sentences(content);
    if sentences.is_empty() {
        return (String::new(), 0, 0);
    }
    let span = &sentences[index.min(sentences.len() - 1)];
    (span.text.clone(), span.offset, span.length)
}
