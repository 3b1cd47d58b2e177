use crate::{DocumentId, FlatIndex, GenerationError, IndexError};
use async_trait::async_trait;

/// Where indexes live between requests.
#[async_trait]
pub trait IndexStore: Send + Sync {
    async fn save(&self, id: &DocumentId, index: &FlatIndex) -> Result<(), IndexError>;

    /// Fails with [`IndexError::NotFound`] for unknown ids.
    async fn load(&self, id: &DocumentId) -> Result<FlatIndex, IndexError>;

    /// Returns whether anything was removed.
    async fn remove(&self, id: &DocumentId) -> Result<bool, IndexError>;

    async fn list(&self) -> Result<Vec<DocumentId>, IndexError>;
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}
