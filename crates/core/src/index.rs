use crate::error::IndexError;
use crate::models::{ScoredChunk, TextChunk};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

pub const INDEX_FILE_NAME: &str = "index.json";
const FORMAT_VERSION: u32 = 1;

/// Exhaustive nearest-neighbor index over squared Euclidean distance.
/// Vectors are stored row-major in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimensions: usize,
    chunks: Vec<TextChunk>,
    vectors: Vec<f32>,
    created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct IndexManifest {
    format_version: u32,
    dimensions: usize,
    created_at: DateTime<Utc>,
    chunks: Vec<TextChunk>,
    /// Little-endian `f32` matrix, base64 encoded.
    vectors: String,
}

impl FlatIndex {
    pub fn build(chunks: Vec<TextChunk>, vectors: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        if chunks.is_empty() {
            return Err(IndexError::Empty);
        }
        if chunks.len() != vectors.len() {
            return Err(IndexError::CountMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }

        let dimensions = vectors[0].len();
        let mut flat = Vec::with_capacity(dimensions * vectors.len());
        for vector in &vectors {
            if vector.len() != dimensions {
                return Err(IndexError::DimensionMismatch {
                    expected: dimensions,
                    found: vector.len(),
                });
            }
            flat.extend_from_slice(vector);
        }

        Ok(Self {
            dimensions,
            chunks,
            vectors: flat,
            created_at: Utc::now(),
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunks in insertion order.
    pub fn chunks(&self) -> &[TextChunk] {
        &self.chunks
    }

    /// Up to `k` nearest chunks, closest first. Ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>, IndexError> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                found: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimensions.max(1))
            .map(|row| {
                row.iter()
                    .zip(query)
                    .map(|(left, right)| (left - right) * (left - right))
                    .sum::<f32>()
            })
            .enumerate()
            .collect();

        scored.sort_by(|left, right| left.1.total_cmp(&right.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(position, distance)| ScoredChunk {
                chunk: self.chunks[position].clone(),
                distance,
            })
            .collect())
    }

    /// Appends every entry of `other`; entries of `self` keep their positions.
    pub fn merge(&mut self, other: FlatIndex) -> Result<(), IndexError> {
        if other.dimensions != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                found: other.dimensions,
            });
        }
        self.chunks.extend(other.chunks);
        self.vectors.extend(other.vectors);
        Ok(())
    }

    pub fn to_json(&self) -> Result<Vec<u8>, IndexError> {
        let bytes: Vec<u8> = self
            .vectors
            .iter()
            .flat_map(|value| value.to_le_bytes())
            .collect();

        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            dimensions: self.dimensions,
            created_at: self.created_at,
            chunks: self.chunks.clone(),
            vectors: STANDARD.encode(bytes),
        };
        Ok(serde_json::to_vec(&manifest)?)
    }

    pub fn from_json(raw: &[u8]) -> Result<Self, IndexError> {
        let manifest: IndexManifest = serde_json::from_slice(raw)?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(IndexError::Corrupt(format!(
                "unsupported format version {}",
                manifest.format_version
            )));
        }

        let bytes = STANDARD
            .decode(manifest.vectors.as_bytes())
            .map_err(|error| IndexError::Corrupt(error.to_string()))?;
        if bytes.len() % 4 != 0 {
            return Err(IndexError::Corrupt(format!(
                "vector payload of {} bytes is not a whole number of f32 values",
                bytes.len()
            )));
        }

        let vectors: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|quad| f32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]))
            .collect();

        if vectors.len() != manifest.dimensions * manifest.chunks.len() {
            return Err(IndexError::Corrupt(format!(
                "{} values cannot hold {} vectors of dimension {}",
                vectors.len(),
                manifest.chunks.len(),
                manifest.dimensions
            )));
        }

        Ok(Self {
            dimensions: manifest.dimensions,
            chunks: manifest.chunks,
            vectors,
            created_at: manifest.created_at,
        })
    }

    /// Writes the index into `dir`, replacing any previous index there.
    /// Nothing is left behind in a directory this call created if writing
    /// fails.
    pub async fn save(&self, dir: &Path) -> Result<(), IndexError> {
        remove_created_dir_on_failure(dir, || self.write_into(dir)).await
    }

    async fn write_into(&self, dir: &Path) -> Result<(), IndexError> {
        let payload = self.to_json()?;
        fs::create_dir_all(dir).await?;

        let staging = dir.join(format!("{INDEX_FILE_NAME}.tmp"));
        fs::write(&staging, payload).await?;
        fs::rename(&staging, dir.join(INDEX_FILE_NAME)).await?;
        Ok(())
    }

    pub async fn load(dir: &Path) -> Result<Self, IndexError> {
        let file = index_file(dir);
        if !fs::try_exists(&file).await? {
            return Err(IndexError::NotFound(dir.display().to_string()));
        }
        let raw = fs::read(&file).await?;
        Self::from_json(&raw)
    }
}

/// Runs `write`; if it fails and `dir` did not exist beforehand, whatever it
/// created there is removed.
async fn remove_created_dir_on_failure<F, Fut>(dir: &Path, write: F) -> Result<(), IndexError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), IndexError>>,
{
    let existed = fs::try_exists(dir).await?;
    let result = write().await;

    if result.is_err() && !existed {
        if let Err(error) = fs::remove_dir_all(dir).await {
            warn!(dir = %dir.display(), %error, "could not remove partial index directory");
        }
    }
    result
}

pub fn index_file(dir: &Path) -> PathBuf {
    dir.join(INDEX_FILE_NAME)
}
