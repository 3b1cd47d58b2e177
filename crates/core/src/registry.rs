use crate::traits::IndexStore;
use crate::{DocumentId, FlatIndex, IndexError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Maps identifiers to indexes. Indexes are written through to the backing
/// store and loaded from it on demand, so ids survive a restart even though
/// this in-memory map does not.
pub struct SessionRegistry {
    live: RwLock<HashMap<DocumentId, Arc<FlatIndex>>>,
    store: Arc<dyn IndexStore>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self {
            live: RwLock::new(HashMap::new()),
            store,
        }
    }

    /// Persists first; the id only becomes visible once the save succeeded.
    pub async fn put(&self, id: DocumentId, index: FlatIndex) -> Result<(), IndexError> {
        self.store.save(&id, &index).await?;
        self.live.write().await.insert(id, Arc::new(index));
        Ok(())
    }

    pub async fn get(&self, id: &DocumentId) -> Result<Arc<FlatIndex>, IndexError> {
        if let Some(index) = self.live.read().await.get(id) {
            return Ok(Arc::clone(index));
        }

        let loaded = Arc::new(self.store.load(id).await?);
        debug!(pdf_id = %id, chunks = loaded.len(), "index loaded from store");
        self.live
            .write()
            .await
            .insert(id.clone(), Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Removes the in-memory entry and the stored index. Unknown ids fail
    /// with [`IndexError::NotFound`].
    pub async fn delete(&self, id: &DocumentId) -> Result<(), IndexError> {
        let was_live = self.live.write().await.remove(id).is_some();
        let was_stored = self.store.remove(id).await?;

        if was_live || was_stored {
            Ok(())
        } else {
            Err(IndexError::NotFound(id.to_string()))
        }
    }

    /// Number of identifiers the backing store knows about.
    pub async fn known_ids(&self) -> Result<usize, IndexError> {
        Ok(self.store.list().await?.len())
    }

    /// Merges the indexes of every resolvable id, in request order.
    /// Malformed and unknown ids are skipped; if none resolve the call fails
    /// with [`IndexError::NoneResolved`].
    pub async fn resolve(&self, raw_ids: &[String]) -> Result<FlatIndex, IndexError> {
        let mut seen = Vec::new();
        let mut combined: Option<FlatIndex> = None;

        for raw in raw_ids {
            let Some(id) = DocumentId::parse(raw) else {
                warn!(pdf_id = %raw, "ignoring malformed identifier");
                continue;
            };
            if seen.contains(&id) {
                continue;
            }

            let index = match self.get(&id).await {
                Ok(index) => index,
                Err(IndexError::NotFound(_)) => {
                    warn!(pdf_id = %id, "no index found for identifier, skipping");
                    continue;
                }
                Err(error) => return Err(error),
            };
            seen.push(id);

            match combined.as_mut() {
                Some(base) => base.merge(FlatIndex::clone(&index))?,
                None => combined = Some(FlatIndex::clone(&index)),
            }
        }

        combined.ok_or(IndexError::NoneResolved)
    }
}
