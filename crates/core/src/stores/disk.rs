use crate::index::index_file;
use crate::traits::IndexStore;
use crate::{DocumentId, FlatIndex, IndexError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// One directory per identifier under `root`, each holding `index.json`.
#[derive(Debug, Clone)]
pub struct DiskIndexStore {
    root: PathBuf,
}

impl DiskIndexStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the root directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, IndexError> {
        let store = Self::new(root);
        fs::create_dir_all(&store.root).await?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, id: &DocumentId) -> PathBuf {
        self.root.join(id.as_str())
    }
}

#[async_trait]
impl IndexStore for DiskIndexStore {
    async fn save(&self, id: &DocumentId, index: &FlatIndex) -> Result<(), IndexError> {
        index.save(&self.path_for(id)).await
    }

    async fn load(&self, id: &DocumentId) -> Result<FlatIndex, IndexError> {
        FlatIndex::load(&self.path_for(id))
            .await
            .map_err(|error| match error {
                IndexError::NotFound(_) => IndexError::NotFound(id.to_string()),
                other => other,
            })
    }

    async fn remove(&self, id: &DocumentId) -> Result<bool, IndexError> {
        let path = self.path_for(id);
        if !fs::try_exists(&path).await? {
            return Ok(false);
        }
        fs::remove_dir_all(&path).await?;
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<DocumentId>, IndexError> {
        if !fs::try_exists(&self.root).await? {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let Some(id) = entry.file_name().to_str().and_then(DocumentId::parse) else {
                continue;
            };
            if fs::try_exists(index_file(&entry.path())).await? {
                ids.push(id);
            }
        }

        ids.sort_unstable();
        Ok(ids)
    }
}
