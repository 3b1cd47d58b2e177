use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

const MAX_ID_LEN: usize = 64;

/// Opaque name of an uploaded document or chat session.
///
/// Identifiers double as directory names under the index root, so parsing
/// only accepts ASCII alphanumerics, `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let valid = !trimmed.is_empty()
            && trimmed.len() <= MAX_ID_LEN
            && trimmed
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');

        valid.then(|| Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw).ok_or_else(|| format!("invalid document identifier: {raw:?}"))
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub chunk_index: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: TextChunk,
    pub distance: f32,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub chunk_max_chars: usize,
    pub chunk_overlap_chars: usize,
    pub separators: Vec<String>,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_max_chars: 1_000,
            chunk_overlap_chars: 100,
            separators: ["\n\n", "\n", " ", ""]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// What to answer with when the hosted model fails or answers poorly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// The retrieved chunk sharing the most words with the question.
    #[default]
    Extractive,
    /// The whole retrieved context behind a short preamble.
    ContextDump,
}

#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    pub top_k: usize,
    /// Neighbors at or beyond this distance are dropped, unless that would
    /// drop all of them.
    pub distance_threshold: Option<f32>,
    pub context_max_chars: usize,
    pub source_preview_chars: usize,
    pub extractive_max_chars: usize,
    pub summary_max_chunks: usize,
    pub fallback: FallbackPolicy,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            distance_threshold: Some(0.8),
            context_max_chars: 1_500,
            source_preview_chars: 100,
            extractive_max_chars: 300,
            summary_max_chunks: 5,
            fallback: FallbackPolicy::Extractive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStrategy {
    Generated,
    Extractive,
    ContextDump,
    NoContext,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub answer: String,
    pub sources: Vec<String>,
    #[serde(skip)]
    pub strategy: Option<AnswerStrategy>,
}

/// Cuts `text` to at most `max_chars` characters, appending `...` when
/// anything was removed.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_parse_back() {
        let id = DocumentId::generate();
        assert_eq!(id.as_str().len(), 32);
        assert_eq!(DocumentId::parse(id.as_str()), Some(id));
    }

    #[test]
    fn path_like_ids_are_rejected() {
        assert!(DocumentId::parse("../etc").is_none());
        assert!(DocumentId::parse("a/b").is_none());
        assert!(DocumentId::parse("   ").is_none());
        assert!(DocumentId::parse(&"x".repeat(65)).is_none());
        assert_eq!(
            DocumentId::parse(" abc-12_3 ").map(|id| id.to_string()),
            Some("abc-12_3".to_string())
        );
    }

    #[test]
    fn deserializing_ids_applies_the_same_rules() {
        let id: DocumentId = serde_json::from_str("\"abc-123\"").unwrap();
        assert_eq!(id.as_str(), "abc-123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc-123\"");

        assert!(serde_json::from_str::<DocumentId>("\"../x\"").is_err());
        assert!(serde_json::from_str::<DocumentId>("\"\"").is_err());
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("abcdef", 3), "abc...");
        assert_eq!(truncate_with_ellipsis("ééééé", 2), "éé...");
        assert_eq!(truncate_with_ellipsis("exact", 5), "exact");
    }
}
