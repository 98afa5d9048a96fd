use crate::dto::test_dto::GenerateTestPayload;
use sha2::{Digest, Sha256};

/// Characters of content that participate in the cache key. Requests that
/// agree on options and on this prefix share a cache entry even if the rest
/// of the content differs. Known, intentional tradeoff: hashing the full
/// content would change hit rates for large pasted notes.
const HASH_PREFIX_CHARS: usize = 1000;

/// Derives the cache key for a generation request from the option set and the
/// first [`HASH_PREFIX_CHARS`] characters of content.
pub fn content_hash(payload: &GenerateTestPayload) -> String {
    let prefix: String = payload.content.chars().take(HASH_PREFIX_CHARS).collect();
    let types = payload
        .question_types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(",");

    let mut hasher = Sha256::new();
    hasher.update(prefix.as_bytes());
    hasher.update(b"|");
    hasher.update(payload.difficulty.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(payload.question_count.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(types.as_bytes());
    hex::encode(hasher.finalize())
}
