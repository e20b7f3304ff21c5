//! In-memory content repository.

use async_trait::async_trait;

use notehub_core::{Content, ContentRepository, Result};

use crate::versioned::VersionedStore;

/// In-memory implementation of ContentRepository.
#[derive(Debug)]
pub struct InMemoryContentRepository {
    store: VersionedStore<Content>,
}

impl InMemoryContentRepository {
    pub fn new() -> Self {
        Self {
            store: VersionedStore::new("content"),
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for InMemoryContentRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentRepository for InMemoryContentRepository {
    async fn save(&self, content: &Content) -> Result<u64> {
        self.store.save(content)
    }

    async fn insert(&self, content: &Content) -> Result<()> {
        self.store.insert(content)
    }

    async fn find_by_id(&self, id: &str) -> Result<Content> {
        self.store.find_by_id(id)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(id)
    }

    async fn delete_at_version(&self, id: &str, version: u64) -> Result<()> {
        self.store.delete_at_version(id, version)
    }

    async fn find_all_by_note_id(&self, note_id: &str) -> Result<Vec<Content>> {
        Ok(self.store.scan(|c| c.note_id == note_id))
    }

    async fn delete_all_by_note_id(&self, note_id: &str) -> Result<usize> {
        let removed = self.store.remove_where(|c| c.note_id == note_id);
        tracing::debug!(note_id, cascade_count = removed, "Deleted note content");
        Ok(removed)
    }
}
