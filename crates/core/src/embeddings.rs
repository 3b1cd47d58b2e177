use crate::EmbeddingError;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::info;

const DEFAULT: usize = 384;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

/// all-MiniLM-L6-v2 sentence embeddings computed locally on CPU through
/// ONNX Runtime. The model is downloaded into `cache_dir` on first load.
pub struct SentenceEmbedder {
    model: TextEmbedding,
}

impl SentenceEmbedder {
    pub fn load(cache_dir: Option<PathBuf>) -> Result<Self, EmbeddingError> {
        let mut options = InitOptions::default();
        options.model_name = EmbeddingModel::AllMiniLML6V2;
        options.show_download_progress = false;
        if let Some(dir) = cache_dir {
            options.cache_dir = dir;
        }

        let model = TextEmbedding::try_new(options)
            .map_err(|error| EmbeddingError::ModelLoad(error.to_string()))?;
        info!(model = "all-MiniLM-L6-v2", dimensions = DEFAULT, "embedding model loaded");
        Ok(Self { model })
    }
}

impl Embedder for SentenceEmbedder {
    fn dimensions(&self) -> usize {
        DEFAULT
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Inference("model returned no embedding".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let vectors = self
            .model
            .embed(texts.to_vec(), None)
            .map_err(|error| EmbeddingError::Inference(error.to_string()))?;

        vectors
            .into_iter()
            .map(|mut vector| {
                if vector.len() != DEFAULT {
                    return Err(EmbeddingError::Inference(format!(
                        "expected {DEFAULT} dimensions, model returned {}",
                        vector.len()
                    )));
                }
                normalize(&mut vector);
                Ok(vector)
            })
            .collect()
    }
}

fn normalize(vector: &mut [f32]) {
    let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in vector.iter_mut() {
            *value /= magnitude;
        }
    }
}

/// Hashes character trigrams and whole words into a fixed number of buckets
/// and L2-normalizes the result. Needs no model files, so it serves tests
/// and offline runs; it only scores near-verbatim wording as close.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

fn fnv1a(token: &str) -> u64 {
    let mut hash = 1469598103934665603u64;
    for byte in token.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    hash
}

impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return Ok(vector);
        }

        let buckets = vector.len() as u64;
        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            vector[(fnv1a(&token) % buckets) as usize] += 1.0;
        }

        for word in lowered.split(|ch: char| !ch.is_alphanumeric()) {
            if word.chars().count() > 2 {
                vector[(fnv1a(&format!("w:{word}")) % buckets) as usize] += 2.0;
            }
        }

        normalize(&mut vector);
        Ok(vector)
    }
}

static SHARED: OnceLock<Arc<dyn Embedder>> = OnceLock::new();

/// Process-wide sentence embedder, loaded on first use and reused
/// afterwards; `cache_dir` only matters for the first successful call.
/// A failed load is not cached.
pub fn shared_embedder(cache_dir: Option<PathBuf>) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    if let Some(existing) = SHARED.get() {
        return Ok(Arc::clone(existing));
    }

    let loaded: Arc<dyn Embedder> = Arc::new(SentenceEmbedder::load(cache_dir)?);
    Ok(Arc::clone(SHARED.get_or_init(|| loaded)))
}
