use crate::dto::test_dto::Flashcard;
use crate::utils::text::split_sentences;

/// Non-AI flashcard generation: one card per usable sentence of the notes,
/// bounded by the requested count. No model call, no rate limit.
#[derive(Clone, Default)]
pub struct FlashcardService;

impl FlashcardService {
    pub fn new() -> Self {
        Self
    }

    pub fn build_flashcards(&self, content: &str, count: u32) -> Vec<Flashcard> {
        split_sentences(content)
            .into_iter()
            .take(count as usize)
            .map(|span| {
                let words: Vec<&str> = span.text.split_whitespace().collect();
                let lead = words[..words.len().min(5)].join(" ");
                Flashcard {
                    front: format!("Complete the statement: \"{} ...\"", lead),
                    back: span.text,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_card_per_sentence_up_to_count() {
        let svc = FlashcardService::new();
        let content = "Photosynthesis converts sunlight into energy. \
                       Plants use chlorophyll to capture that light. \
                       Water is split into oxygen during the process.";
        let cards = svc.build_flashcards(content, 2);
        assert_eq!(cards.len(), 2);
        assert!(cards[0].front.starts_with("Complete the statement"));
        assert_eq!(cards[0].back, "Photosynthesis converts sunlight into energy");
    }

    #[test]
    fn short_fragments_produce_no_cards() {
        let svc = FlashcardService::new();
        assert!(svc.build_flashcards("Too short. Tiny.", 5).is_empty());
    }
}
