//! Core traits for notehub storage backends.

use async_trait::async_trait;

use crate::{Content, Keyword, Note, Result};

/// A record held by a versioned store.
///
/// `version` is the value the caller last read. Stores compare it on save and
/// write back the incremented value through `set_version`.
pub trait Versioned: Clone + Send + Sync + 'static {
    fn id(&self) -> &str;

    fn version(&self) -> u64;

    fn set_version(&mut self, version: u64);
}

impl Versioned for Note {
    fn id(&self) -> &str {
        Note::id(self)
    }

    fn version(&self) -> u64 {
        Note::version(self)
    }

    fn set_version(&mut self, version: u64) {
        Note::set_version(self, version)
    }
}

impl Versioned for Content {
    fn id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}

/// Repository for note aggregates.
///
/// Every implementation, in-memory or durable, follows the same optimistic
/// concurrency contract: `save` inserts unknown ids at version 0 and
/// otherwise succeeds only when `note.version()` equals the stored version,
/// returning `Error::Conflict` without writing on mismatch.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert or compare-and-increment. Returns the stored version.
    async fn save(&self, note: &Note) -> Result<u64>;

    /// Store a new note at version 0; `Conflict` if the id is taken.
    async fn insert(&self, note: &Note) -> Result<()>;

    /// Fetch an independent copy.
    async fn find_by_id(&self, id: &str) -> Result<Note>;

    /// Delete regardless of version.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete only if the stored version still equals `version`.
    async fn delete_at_version(&self, id: &str, version: u64) -> Result<()>;

    /// Notes on which `user_id` has tagged `keyword`.
    async fn find_by_keyword_for_user(&self, user_id: &str, keyword: &Keyword)
        -> Result<Vec<Note>>;

    /// Notes owned by or shared with `user_id`.
    async fn get_accessible_notes_by_user_id(&self, user_id: &str) -> Result<Vec<Note>>;
}

/// Repository for content blocks. Same save contract as [`NoteRepository`].
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn save(&self, content: &Content) -> Result<u64>;

    async fn insert(&self, content: &Content) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Content>;

    async fn delete(&self, id: &str) -> Result<()>;

    async fn delete_at_version(&self, id: &str, version: u64) -> Result<()>;

    /// All blocks referencing `note_id`, in no particular order.
    async fn find_all_by_note_id(&self, note_id: &str) -> Result<Vec<Content>>;

    /// Cascade delete. Returns the number of blocks removed.
    async fn delete_all_by_note_id(&self, note_id: &str) -> Result<usize>;
}
