use crate::embeddings::Embedder;
use crate::models::{
    truncate_with_ellipsis, AnswerStrategy, ChatAnswer, FallbackPolicy, RetrievalOptions,
    ScoredChunk,
};
use crate::traits::CompletionClient;
use crate::{FlatIndex, IndexError};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const NO_RELEVANT_INFORMATION: &str =
    "I couldn't find relevant information in the provided documents.";
pub const NO_SPECIFIC_ANSWER: &str =
    "I found some related information but couldn't extract a specific answer.";
pub const CONTEXT_DUMP_PREAMBLE: &str =
    "Based on the documents, here's some relevant information:\n\n";
pub const EMPTY_DOCUMENT_SUMMARY: &str = "No content found in the document.";

const NON_ANSWER_PHRASES: [&str; 3] = ["I apologize", "I'm sorry", "I am just a language model"];
const MIN_ANSWER_CHARS: usize = 5;

/// Retrieves context for a question and turns it into an answer, using the
/// hosted model when one is configured and a local fallback otherwise.
pub struct AnswerGenerator {
    embedder: Arc<dyn Embedder>,
    completion: Option<Arc<dyn CompletionClient>>,
    options: RetrievalOptions,
}

impl AnswerGenerator {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        completion: Option<Arc<dyn CompletionClient>>,
        options: RetrievalOptions,
    ) -> Self {
        Self {
            embedder,
            completion,
            options,
        }
    }

    pub fn has_completion(&self) -> bool {
        self.completion.is_some()
    }

    /// Never fails because of the hosted model; only retrieval errors
    /// propagate.
    pub async fn answer(&self, question: &str, index: &FlatIndex) -> Result<ChatAnswer, IndexError> {
        let hits = self.retrieve(question, index)?;
        if hits.is_empty() {
            return Ok(ChatAnswer {
                answer: NO_RELEVANT_INFORMATION.to_string(),
                sources: Vec::new(),
                strategy: Some(AnswerStrategy::NoContext),
            });
        }

        let context = build_context(&hits, self.options.context_max_chars);
        let prompt = build_prompt(&context, question);

        let (answer, strategy) = match self.generate(&prompt).await {
            Some(generated) => (generated, AnswerStrategy::Generated),
            None => self.fallback(question, &hits, &context),
        };
        info!(?strategy, hits = hits.len(), "answer produced");

        let sources = hits
            .iter()
            .map(|hit| truncate_with_ellipsis(&hit.chunk.text, self.options.source_preview_chars))
            .collect();

        Ok(ChatAnswer {
            answer,
            sources,
            strategy: Some(strategy),
        })
    }

    pub fn retrieve(&self, question: &str, index: &FlatIndex) -> Result<Vec<ScoredChunk>, IndexError> {
        let query = self.embedder.embed(question)?;
        let hits = index.search(&query, self.options.top_k)?;
        Ok(apply_threshold(hits, self.options.distance_threshold))
    }

    async fn generate(&self, prompt: &str) -> Option<String> {
        let client = self.completion.as_ref()?;
        match client.complete(prompt).await {
            Ok(text) if is_acceptable(&text) => Some(text.trim().to_string()),
            Ok(text) => {
                debug!(completion = %text, "discarding low-quality completion");
                None
            }
            Err(error) => {
                warn!(%error, "hosted inference failed, using fallback answer");
                None
            }
        }
    }

    fn fallback(
        &self,
        question: &str,
        hits: &[ScoredChunk],
        context: &str,
    ) -> (String, AnswerStrategy) {
        match self.options.fallback {
            FallbackPolicy::Extractive => (
                extractive_answer(question, hits, self.options.extractive_max_chars),
                AnswerStrategy::Extractive,
            ),
            FallbackPolicy::ContextDump => (
                format!("{CONTEXT_DUMP_PREAMBLE}{context}"),
                AnswerStrategy::ContextDump,
            ),
        }
    }

    /// Overview built from the first chunks of an index in document order.
    pub fn summarize(&self, index: &FlatIndex) -> String {
        let previews = index
            .chunks()
            .iter()
            .take(self.options.summary_max_chunks)
            .map(|chunk| format!("{}...", truncated(&chunk.text, self.options.extractive_max_chars)))
            .collect::<Vec<_>>();

        if previews.is_empty() {
            return EMPTY_DOCUMENT_SUMMARY.to_string();
        }
        format!(
            "Document contains information about:\n\n{}",
            previews.join("\n\n")
        )
    }
}

/// Drops neighbors at or past `threshold`, keeping the unfiltered list when
/// the filter would leave nothing.
pub fn apply_threshold(hits: Vec<ScoredChunk>, threshold: Option<f32>) -> Vec<ScoredChunk> {
    let Some(limit) = threshold else {
        return hits;
    };

    let close: Vec<ScoredChunk> = hits
        .iter()
        .filter(|hit| hit.distance < limit)
        .cloned()
        .collect();

    if close.is_empty() {
        hits
    } else {
        close
    }
}

pub fn build_context(hits: &[ScoredChunk], max_chars: usize) -> String {
    let joined = hits
        .iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    truncate_with_ellipsis(&joined, max_chars)
}

pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Based on the following context from the documents, please answer the question.\n\n\
         Context:\n{context}\n\n\
         Question: {question}\n\n\
         Answer:"
    )
}

pub fn is_acceptable(completion: &str) -> bool {
    let trimmed = completion.trim();
    trimmed.chars().count() > MIN_ANSWER_CHARS
        && !NON_ANSWER_PHRASES
            .iter()
            .any(|phrase| trimmed.contains(phrase))
}

fn words(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|ch: char| !ch.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect()
}

/// The hit sharing the most words with the question; earlier hits win ties.
pub fn extractive_answer(question: &str, hits: &[ScoredChunk], max_chars: usize) -> String {
    let question_words = words(question);
    let mut best: Option<(&str, usize)> = None;

    for hit in hits {
        let overlap = words(&hit.chunk.text)
            .intersection(&question_words)
            .count();
        if overlap > best.map_or(0, |(_, score)| score) {
            best = Some((&hit.chunk.text, overlap));
        }
    }

    match best {
        Some((text, _)) => truncate_with_ellipsis(text, max_chars),
        None => NO_SPECIFIC_ANSWER.to_string(),
    }
}

fn truncated(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
