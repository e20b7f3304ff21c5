//! Content block orchestration.
//!
//! Content records version independently of their note. Updating a block's
//! data bumps only the block's version; viewers of the owning note receive
//! an `update_content` event stamped with the note's current version.

use std::sync::Arc;

use notehub_core::{
    ids, ConnectionRegistry, Content, ContentRepository, ContentType, Error, NoteRepository,
    Result, WebSocketEvent,
};
use notehub_store::Store;
use tracing::instrument;

#[derive(Clone)]
pub struct ContentService {
    notes: Arc<dyn NoteRepository>,
    contents: Arc<dyn ContentRepository>,
    registry: Arc<ConnectionRegistry>,
}

impl ContentService {
    pub fn new(store: &Store, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            notes: Arc::clone(&store.notes),
            contents: Arc::clone(&store.contents),
            registry,
        }
    }

    /// Create a block referencing `note_id` and return its id. Membership in
    /// the note is a separate step (`NoteService::add_content`).
    #[instrument(skip(self, data), fields(subsystem = "service", op = "create_content"))]
    pub async fn create_content(
        &self,
        note_id: &str,
        content_id: &str,
        data: &str,
        content_type: &str,
    ) -> Result<String> {
        ids::require(note_id, "note")?;
        let content_type: ContentType = content_type.parse()?;
        let content = Content::new(ids::or_generate(content_id), note_id, data, content_type);
        self.contents.insert(&content).await?;

        tracing::debug!(note_id, content_id = %content.id, "Content created");
        Ok(content.id)
    }

    pub async fn get_content_by_id(&self, id: &str) -> Result<Content> {
        ids::require(id, "content")?;
        self.contents.find_by_id(id).await
    }

    /// Replace a block's data at `version` and return the new version.
    #[instrument(skip(self, data), fields(subsystem = "service", op = "update_content"))]
    pub async fn update_content(&self, id: &str, data: &str, version: u64) -> Result<u64> {
        ids::require(id, "content")?;
        let mut content = self.contents.find_by_id(id).await?;
        if content.version != version {
            return Err(Error::conflict(id, version, content.version));
        }
        content.data = data.to_string();
        content.version = self.contents.save(&content).await?;

        match self.notes.find_by_id(&content.note_id).await {
            Ok(note) => {
                self.registry
                    .broadcast_event(&WebSocketEvent::update_content(&content, note.version()));
            }
            Err(e) => {
                tracing::debug!(
                    content_id = id,
                    note_id = %content.note_id,
                    error = %e,
                    "Owning note unavailable, update not broadcast"
                );
            }
        }
        Ok(content.version)
    }

    /// Delete a block's record at `version`. Note membership is not touched;
    /// see `NoteService::delete_content_from_note` for the combined step.
    #[instrument(skip(self), fields(subsystem = "service", op = "delete_content"))]
    pub async fn delete_content(&self, id: &str, version: u64) -> Result<()> {
        ids::require(id, "content")?;
        self.contents.delete_at_version(id, version).await
    }
}
