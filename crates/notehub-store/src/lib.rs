//! # notehub-store
//!
//! In-memory storage layer for notehub.
//!
//! This crate provides:
//! - [`VersionedStore`], a sharded map with optimistic concurrency control
//! - Repository implementations for notes and content blocks
//! - [`Store`], the bundle handed to the service layer
//!
//! ## Example
//!
//! ```rust,ignore
//! use notehub_store::{Note, NoteRepository, Store};
//!
//! let store = Store::new();
//! let note = Note::new("", "Groceries", "alice")?;
//! store.notes.insert(&note).await?;
//!
//! let mut read = store.notes.find_by_id(note.id()).await?;
//! read.change_title("Errands")?;
//! let version = store.notes.save(&read).await?; // 1
//! ```

pub mod contents;
pub mod notes;
pub mod versioned;

use std::sync::Arc;

// Re-export core types
pub use notehub_core::*;

pub use contents::InMemoryContentRepository;
pub use notes::InMemoryNoteRepository;
pub use versioned::VersionedStore;

/// The note and content repositories, shareable across tasks.
#[derive(Clone)]
pub struct Store {
    pub notes: Arc<dyn NoteRepository>,
    pub contents: Arc<dyn ContentRepository>,
}

impl Store {
    /// Fresh in-memory repositories.
    pub fn new() -> Self {
        Self {
            notes: Arc::new(InMemoryNoteRepository::new()),
            contents: Arc::new(InMemoryContentRepository::new()),
        }
    }

    /// Wrap existing repositories, e.g. a durable backend.
    pub fn with_repositories(
        notes: Arc<dyn NoteRepository>,
        contents: Arc<dyn ContentRepository>,
    ) -> Self {
        Self { notes, contents }
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
