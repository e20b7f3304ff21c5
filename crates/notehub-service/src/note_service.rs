//! Note orchestration.
//!
//! Each mutating call runs the same sequence:
//!
//! 1. validate ids, read the note, and compare the caller's version with the
//!    stored one (`Conflict` on mismatch, nothing written)
//! 2. apply the domain mutation on the local copy
//! 3. `save` it back; the store repeats the version check atomically, so a
//!    writer racing between steps 1 and 3 still gets `Conflict`
//! 4. broadcast the event carrying the new version
//!
//! ## Error Handling
//!
//! Store and domain errors are returned unchanged. Nothing here retries: a
//! `Conflict` means the caller must re-read and decide. Broadcasting cannot
//! fail and never undoes a committed save.

use std::collections::HashMap;
use std::sync::Arc;

use notehub_core::{
    ids, ConnectionRegistry, Content, ContentRepository, ContentType, Error, InsertPosition,
    Keyword, Note, NoteRepository, Permission, Result, Versioned, WebSocketEvent,
};
use notehub_store::Store;
use tracing::instrument;

/// Orchestrates note reads and writes and fans out the resulting events.
#[derive(Clone)]
pub struct NoteService {
    notes: Arc<dyn NoteRepository>,
    contents: Arc<dyn ContentRepository>,
    registry: Arc<ConnectionRegistry>,
}

impl NoteService {
    pub fn new(store: &Store, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            notes: Arc::clone(&store.notes),
            contents: Arc::clone(&store.contents),
            registry,
        }
    }

    /// Create a note at version 0 and return its id. An empty `id` gets a
    /// generated one; an id already in use is a `Conflict`.
    #[instrument(skip(self, title), fields(subsystem = "service", op = "create_note"))]
    pub async fn create_note(&self, id: &str, title: &str, owner_id: &str) -> Result<String> {
        let note = Note::new(id, title, owner_id)?;
        self.notes.insert(&note).await?;
        tracing::info!(note_id = note.id(), user_id = owner_id, "Note created");
        Ok(note.id().to_string())
    }

    pub async fn get_note_by_id(&self, id: &str) -> Result<Note> {
        ids::require(id, "note")?;
        self.notes.find_by_id(id).await
    }

    /// Content records of a note in the note's order. Ids without a record
    /// are skipped.
    pub async fn get_note_contents(&self, note_id: &str) -> Result<Vec<Content>> {
        let note = self.get_note_by_id(note_id).await?;
        let mut by_id: HashMap<String, Content> = self
            .contents
            .find_all_by_note_id(note_id)
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        Ok(note
            .content_ids()
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect())
    }

    #[instrument(skip(self, title), fields(subsystem = "service", op = "update_title"))]
    pub async fn update_title(&self, id: &str, title: &str, version: u64) -> Result<u64> {
        let mut note = self.load(id, version).await?;
        note.change_title(title)?;
        let note = self.persist(note).await?;

        self.registry
            .broadcast_event(&WebSocketEvent::update_note(&note));
        Ok(note.version())
    }

    /// Delete a note at `version`, cascade to its content, tell viewers, and
    /// close their subscriptions.
    #[instrument(skip(self), fields(subsystem = "service", op = "delete_note"))]
    pub async fn delete_note(&self, id: &str, version: u64) -> Result<()> {
        ids::require(id, "note")?;
        self.notes.delete_at_version(id, version).await?;
        let cascade = self.contents.delete_all_by_note_id(id).await;

        self.registry
            .broadcast_event(&WebSocketEvent::delete_note(id, version + 1));
        let closed = self.registry.close_by_id(id);

        let removed = cascade?;
        tracing::info!(
            note_id = id,
            cascade_count = removed,
            subscriber_count = closed,
            "Note deleted"
        );
        Ok(())
    }

    /// Insert an existing content id into the note. `index` is `-1` to append
    /// or a position in `0..=len`.
    #[instrument(skip(self), fields(subsystem = "service", op = "add_content"))]
    pub async fn add_content(
        &self,
        note_id: &str,
        content_id: &str,
        index: i64,
        version: u64,
    ) -> Result<u64> {
        let mut note = self.load(note_id, version).await?;
        let position = insert_position(&note, index)?;
        let at = note.add_content_id(content_id, position)?;
        let note = self.persist(note).await?;

        // The membership change stands on its own; the record only enriches the event.
        let content = self.contents.find_by_id(content_id).await.ok();
        self.registry.broadcast_event(&WebSocketEvent::add_content(
            &note,
            content_id,
            content.as_ref(),
            at,
        ));
        Ok(note.version())
    }

    /// Create a content record and insert it into the note in one call.
    /// Returns the content id and the note's new version. If the note save
    /// fails, the new record is removed again.
    #[instrument(skip(self, data), fields(subsystem = "service", op = "create_content_in_note"))]
    pub async fn create_content_in_note(
        &self,
        note_id: &str,
        content_id: &str,
        content_type: &str,
        data: &str,
        index: i64,
        version: u64,
    ) -> Result<(String, u64)> {
        let content_type: ContentType = content_type.parse()?;
        let mut note = self.load(note_id, version).await?;
        let position = insert_position(&note, index)?;

        let content = Content::new(ids::or_generate(content_id), note_id, data, content_type);
        let at = note.add_content_id(content.id.clone(), position)?;
        self.contents.insert(&content).await?;

        let note = match self.persist(note).await {
            Ok(note) => note,
            Err(e) => {
                if let Err(rollback) = self.contents.delete(&content.id).await {
                    tracing::warn!(
                        note_id,
                        content_id = %content.id,
                        error = %rollback,
                        "Failed to remove content after rejected note save"
                    );
                }
                return Err(e);
            }
        };

        self.registry.broadcast_event(&WebSocketEvent::add_content(
            &note,
            &content.id,
            Some(&content),
            at,
        ));
        Ok((content.id, note.version()))
    }

    /// Take a content id out of the note. The content record is untouched.
    #[instrument(skip(self), fields(subsystem = "service", op = "remove_content"))]
    pub async fn remove_content(&self, note_id: &str, content_id: &str, version: u64) -> Result<u64> {
        let mut note = self.load(note_id, version).await?;
        let at = note.remove_content_id(content_id)?;
        let note = self.persist(note).await?;

        self.registry
            .broadcast_event(&WebSocketEvent::delete_content(&note, content_id, Some(at)));
        Ok(note.version())
    }

    /// Take a content id out of the note and delete its record. Both
    /// versions must be current. The record is deleted first, so a block
    /// edited in the meantime fails the call with `Conflict` and the note is
    /// left as it was.
    #[instrument(skip(self), fields(subsystem = "service", op = "delete_content_from_note"))]
    pub async fn delete_content_from_note(
        &self,
        note_id: &str,
        content_id: &str,
        note_version: u64,
        content_version: u64,
    ) -> Result<u64> {
        ids::require(content_id, "content")?;
        let mut note = self.load(note_id, note_version).await?;
        let at = note.remove_content_id(content_id)?;

        let content = self.contents.find_by_id(content_id).await?;
        if content.note_id != note_id {
            return Err(Error::ContentNotFound(content_id.to_string()));
        }
        if content.version != content_version {
            return Err(Error::conflict(content_id, content_version, content.version));
        }

        self.contents
            .delete_at_version(content_id, content_version)
            .await?;
        let note = match self.persist(note).await {
            Ok(note) => note,
            Err(e) => {
                // Reads skip ids without a record; `remove_content` detaches it.
                tracing::warn!(
                    note_id,
                    content_id,
                    error = %e,
                    "Note save rejected after content delete"
                );
                return Err(e);
            }
        };

        self.registry
            .broadcast_event(&WebSocketEvent::delete_content(&note, content_id, Some(at)));
        Ok(note.version())
    }

    /// Add a private keyword for `user_id`. Not broadcast.
    #[instrument(skip(self), fields(subsystem = "service", op = "tag_note"))]
    pub async fn tag_note(
        &self,
        note_id: &str,
        user_id: &str,
        keyword: &str,
        version: u64,
    ) -> Result<u64> {
        ids::require(user_id, "user")?;
        let keyword = Keyword::new(keyword)?;
        let mut note = self.load(note_id, version).await?;
        note.add_keyword(user_id, keyword)?;
        Ok(self.persist(note).await?.version())
    }

    #[instrument(skip(self), fields(subsystem = "service", op = "untag_note"))]
    pub async fn untag_note(
        &self,
        note_id: &str,
        user_id: &str,
        keyword: &str,
        version: u64,
    ) -> Result<u64> {
        ids::require(user_id, "user")?;
        let keyword = Keyword::new(keyword)?;
        let mut note = self.load(note_id, version).await?;
        note.remove_keyword(user_id, &keyword)?;
        Ok(self.persist(note).await?.version())
    }

    /// Notes `user_id` tagged with `keyword`. Blank input matches nothing.
    pub async fn find_notes_by_keyword(&self, user_id: &str, keyword: &str) -> Result<Vec<Note>> {
        if user_id.trim().is_empty() {
            return Ok(Vec::new());
        }
        let Ok(keyword) = Keyword::new(keyword) else {
            return Ok(Vec::new());
        };
        self.notes.find_by_keyword_for_user(user_id, &keyword).await
    }

    /// Grant `user_id` access. `owner_id` must own the note; an existing
    /// grant is replaced.
    #[instrument(skip(self), fields(subsystem = "service", op = "share_note"))]
    pub async fn share_note(
        &self,
        note_id: &str,
        owner_id: &str,
        user_id: &str,
        permission: &str,
        version: u64,
    ) -> Result<u64> {
        let permission: Permission = permission.parse()?;
        let mut note = self.load(note_id, version).await?;
        note.add_collaborator(owner_id, user_id, permission)?;
        let note = self.persist(note).await?;

        tracing::info!(note_id, user_id, permission = %permission, "Note shared");
        Ok(note.version())
    }

    /// Revoke `user_id`'s grant along with their keywords on the note.
    #[instrument(skip(self), fields(subsystem = "service", op = "revoke_access"))]
    pub async fn revoke_access(
        &self,
        note_id: &str,
        owner_id: &str,
        user_id: &str,
        version: u64,
    ) -> Result<u64> {
        let mut note = self.load(note_id, version).await?;
        note.remove_collaborator(owner_id, user_id)?;
        let note = self.persist(note).await?;

        tracing::info!(note_id, user_id, "Access revoked");
        Ok(note.version())
    }

    pub async fn get_accessible_notes(&self, user_id: &str) -> Result<Vec<Note>> {
        ids::require(user_id, "user")?;
        self.notes.get_accessible_notes_by_user_id(user_id).await
    }

    async fn load(&self, id: &str, version: u64) -> Result<Note> {
        ids::require(id, "note")?;
        let note = self.notes.find_by_id(id).await?;
        if note.version() != version {
            tracing::debug!(
                note_id = id,
                expected_version = version,
                version = note.version(),
                "Stale version"
            );
            return Err(Error::conflict(id, version, note.version()));
        }
        Ok(note)
    }

    /// Save and return the note as stored.
    async fn persist(&self, mut note: Note) -> Result<Note> {
        let version = self.notes.save(&note).await?;
        Versioned::set_version(&mut note, version);
        tracing::debug!(note_id = note.id(), version, "Note saved");
        Ok(note)
    }
}

/// Resolve a raw index against the note's current length.
fn insert_position(note: &Note, index: i64) -> Result<InsertPosition> {
    InsertPosition::from_index(index).map_err(|_| Error::IndexOutOfBounds {
        index,
        len: note.content_ids().len(),
    })
}
