use crate::error::IngestError;
use crate::models::{IngestionOptions, TextChunk};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub max_chars: usize,
    pub overlap_chars: usize,
    pub separators: Vec<String>,
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            max_chars: value.chunk_max_chars,
            overlap_chars: value.chunk_overlap_chars,
            separators: value.separators.clone(),
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "max_chars must be positive".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than chunk size {}",
                self.overlap_chars, self.max_chars
            )));
        }
        Ok(())
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Splits `text` into overlapping chunks of at most `max_chars` characters.
///
/// The first separator present in the text wins; pieces that are still too
/// long are split again with the remaining separators. An empty separator
/// splits into single characters.
pub fn split_text(text: &str, config: &ChunkingConfig) -> Result<Vec<String>, IngestError> {
    config.validate()?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(split_recursive(text, &config.separators, config))
}

fn split_recursive(text: &str, separators: &[String], config: &ChunkingConfig) -> Vec<String> {
    let mut separator = separators.last().map(String::as_str).unwrap_or("");
    let mut remaining: &[String] = &[];

    for (position, candidate) in separators.iter().enumerate() {
        if candidate.is_empty() {
            separator = "";
            break;
        }
        if text.contains(candidate.as_str()) {
            separator = candidate;
            remaining = &separators[position + 1..];
            break;
        }
    }

    let splits: Vec<String> = if separator.is_empty() {
        text.chars().map(String::from).collect()
    } else {
        text.split(separator)
            .filter(|piece| !piece.is_empty())
            .map(str::to_string)
            .collect()
    };

    let mut chunks = Vec::new();
    let mut pending = Vec::new();

    for piece in splits {
        if char_len(&piece) < config.max_chars {
            pending.push(piece);
            continue;
        }

        if !pending.is_empty() {
            chunks.extend(merge_splits(&pending, separator, config));
            pending.clear();
        }

        if remaining.is_empty() {
            chunks.push(piece);
        } else {
            chunks.extend(split_recursive(&piece, remaining, config));
        }
    }

    if !pending.is_empty() {
        chunks.extend(merge_splits(&pending, separator, config));
    }

    chunks
}

/// Greedily packs pieces into chunks, carrying trailing pieces of each
/// emitted chunk into the next one until at most `overlap_chars` remain.
fn merge_splits(pieces: &[String], separator: &str, config: &ChunkingConfig) -> Vec<String> {
    let separator_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut window: std::collections::VecDeque<(String, usize)> = Default::default();
    let mut total = 0usize;

    for piece in pieces {
        let len = char_len(piece);
        let joiner = if window.is_empty() { 0 } else { separator_len };

        if total + len + joiner > config.max_chars && !window.is_empty() {
            push_joined(&mut chunks, &window, separator);

            while total > config.overlap_chars
                || (total > 0
                    && total + len + if window.is_empty() { 0 } else { separator_len }
                        > config.max_chars)
            {
                let Some((_, front_len)) = window.pop_front() else {
                    break;
                };
                let front_joiner = if window.is_empty() { 0 } else { separator_len };
                total = total.saturating_sub(front_len + front_joiner);
            }
        }

        let joiner = if window.is_empty() { 0 } else { separator_len };
        total += len + joiner;
        window.push_back((piece.clone(), len));
    }

    push_joined(&mut chunks, &window, separator);
    chunks
}

fn push_joined(
    chunks: &mut Vec<String>,
    window: &std::collections::VecDeque<(String, usize)>,
    separator: &str,
) {
    let joined = window
        .iter()
        .map(|(piece, _)| piece.as_str())
        .collect::<Vec<_>>()
        .join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

pub fn build_chunks(
    document_id: &str,
    text: &str,
    options: &IngestionOptions,
) -> Result<Vec<TextChunk>, IngestError> {
    let config = ChunkingConfig::from(options);
    let pieces = split_text(text, &config)?;

    Ok(pieces
        .into_iter()
        .enumerate()
        .map(|(index, piece)| {
            let chunk_index = index as u64;
            TextChunk {
                chunk_id: make_chunk_id(document_id, chunk_index, &piece),
                document_id: document_id.to_string(),
                chunk_index,
                text: piece,
            }
        })
        .collect())
}

fn make_chunk_id(document_id: &str, index: u64, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(index.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_chars: usize, overlap_chars: usize) -> ChunkingConfig {
        ChunkingConfig {
            max_chars,
            overlap_chars,
            ..ChunkingConfig::from(&IngestionOptions::default())
        }
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_text("", &config(100, 10)).unwrap().is_empty());
        assert!(split_text(" \n\n ", &config(100, 10)).unwrap().is_empty());
    }

    #[test]
    fn short_text_is_a_single_trimmed_chunk() {
        let chunks = split_text("  hello world  ", &config(100, 10)).unwrap();
        assert_eq!(chunks, vec!["hello world".to_string()]);
    }

    #[test]
    fn paragraphs_are_preferred_split_points() {
        let text = "alpha beta gamma\n\ndelta epsilon zeta\n\neta theta iota";
        let chunks = split_text(text, &config(20, 0)).unwrap();
        assert_eq!(
            chunks,
            vec![
                "alpha beta gamma".to_string(),
                "delta epsilon zeta".to_string(),
                "eta theta iota".to_string(),
            ]
        );
    }

    #[test]
    fn chunks_respect_size_and_overlap() {
        let text = (0..400)
            .map(|i| format!("word{i}"))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = split_text(&text, &config(100, 30)).unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100, "chunk too long: {chunk}");
        }

        for pair in chunks.windows(2) {
            let last_word = pair[0].split(' ').last().unwrap();
            assert!(
                pair[1].starts_with(last_word) || pair[1].contains(&format!(" {last_word} ")),
                "expected overlap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn unbroken_text_falls_back_to_characters() {
        let text = "x".repeat(250);
        let chunks = split_text(&text, &config(100, 10)).unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 100));
        assert_eq!(chunks[1].len(), 100);
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let result = split_text("text", &config(10, 10));
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));
    }

    #[test]
    fn built_chunks_are_ordered_and_identified() {
        let text = "First paragraph here.\n\nSecond paragraph here.";
        let options = IngestionOptions {
            chunk_max_chars: 25,
            chunk_overlap_chars: 5,
            ..IngestionOptions::default()
        };

        let chunks = build_chunks("doc-1", text, &options).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].chunk_index, 1);
        assert_eq!(chunks[0].document_id, "doc-1");
        assert_ne!(chunks[0].chunk_id, chunks[1].chunk_id);
        assert_eq!(chunks[0].chunk_id.len(), 64);
    }
}
