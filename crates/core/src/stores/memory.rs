use crate::traits::IndexStore;
use crate::{DocumentId, FlatIndex, IndexError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keeps indexes for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    indexes: RwLock<HashMap<DocumentId, FlatIndex>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn save(&self, id: &DocumentId, index: &FlatIndex) -> Result<(), IndexError> {
        self.indexes.write().await.insert(id.clone(), index.clone());
        Ok(())
    }

    async fn load(&self, id: &DocumentId) -> Result<FlatIndex, IndexError> {
        self.indexes
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| IndexError::NotFound(id.to_string()))
    }

    async fn remove(&self, id: &DocumentId) -> Result<bool, IndexError> {
        Ok(self.indexes.write().await.remove(id).is_some())
    }

    async fn list(&self) -> Result<Vec<DocumentId>, IndexError> {
        let mut ids: Vec<DocumentId> = self.indexes.read().await.keys().cloned().collect();
        ids.sort_unstable();
        Ok(ids)
    }
}
