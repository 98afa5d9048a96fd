/// A sentence of the source content with its location, so callers can slice
/// the original text byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceSpan {
    pub text: String,
    pub offset: usize,
    pub length: usize,
}

/// Minimum character count for a sentence to be considered usable as a
/// source span or flashcard. Filters out headings and stray fragments.
const MIN_SENTENCE_CHARS: usize = 20;

/// Splits content on `.`, `!` and `?`, keeping trimmed sentences longer than
/// [`MIN_SENTENCE_CHARS`]. Offsets point at the trimmed text within the
/// original content. Approximate by design: abbreviations and decimals split
/// too, which is acceptable for attribution fallback.
pub fn split_sentences(content: &str) -> Vec<SentenceSpan> {
    let mut spans = Vec::new();
    let mut start = 0;
    for (i, ch) in content.char_indices() {
        if matches!(ch, '.' | '!' | '?') {
            push_span(content, start, i, &mut spans);
            start = i + ch.len_utf8();
        }
    }
    push_span(content, start, content.len(), &mut spans);
    spans
}

fn push_span(content: &str, start: usize, end: usize, spans: &mut Vec<SentenceSpan>) {
    let raw = &content[start..end];
    let trimmed = raw.trim();
    if trimmed.chars().count() > MIN_SENTENCE_CHARS {
        let offset = start + (raw.len() - raw.trim_start().len());
        spans.push(SentenceSpan {
            text: trimmed.to_string(),
            offset,
            length: trimmed.len(),
        });
    }
}

/// ASCII case-insensitive substring search returning the byte offset of the
/// first match. Byte-wise comparison keeps the offset valid against the
/// original content; non-ASCII case folding is deliberately not attempted.
pub fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    (0..=h.len() - n.len()).find(|&i| h[i..i + n.len()].eq_ignore_ascii_case(n))
}
