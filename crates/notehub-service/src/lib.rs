//! # notehub-service
//!
//! Service layer for notehub. Sequences read, domain mutation, optimistic
//! save and broadcast for every externally triggered operation.

pub mod content_service;
pub mod note_service;

use std::sync::Arc;

use notehub_core::ConnectionRegistry;
use notehub_store::Store;

pub use content_service::ContentService;
pub use note_service::NoteService;

/// Services sharing one store and one connection registry.
#[derive(Clone)]
pub struct Services {
    pub notes: NoteService,
    pub contents: ContentService,
    pub registry: Arc<ConnectionRegistry>,
}

impl Services {
    pub fn new(store: &Store, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            notes: NoteService::new(store, Arc::clone(&registry)),
            contents: ContentService::new(store, Arc::clone(&registry)),
            registry,
        }
    }
}
