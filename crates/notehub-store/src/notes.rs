//! In-memory note repository.

use async_trait::async_trait;

use notehub_core::{Keyword, Note, NoteRepository, Result};

use crate::versioned::VersionedStore;

/// In-memory implementation of NoteRepository.
#[derive(Debug)]
pub struct InMemoryNoteRepository {
    store: VersionedStore<Note>,
}

impl InMemoryNoteRepository {
    pub fn new() -> Self {
        Self {
            store: VersionedStore::new("note"),
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for InMemoryNoteRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NoteRepository for InMemoryNoteRepository {
    async fn save(&self, note: &Note) -> Result<u64> {
        self.store.save(note)
    }

    async fn insert(&self, note: &Note) -> Result<()> {
        self.store.insert(note)
    }

    async fn find_by_id(&self, id: &str) -> Result<Note> {
        self.store.find_by_id(id)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.store.delete(id)
    }

    async fn delete_at_version(&self, id: &str, version: u64) -> Result<()> {
        self.store.delete_at_version(id, version)
    }

    async fn find_by_keyword_for_user(
        &self,
        user_id: &str,
        keyword: &Keyword,
    ) -> Result<Vec<Note>> {
        let notes = self.store.scan(|n| n.has_keyword(user_id, keyword));
        tracing::debug!(user_id, keyword = %keyword, result_count = notes.len(), "Keyword scan");
        Ok(notes)
    }

    async fn get_accessible_notes_by_user_id(&self, user_id: &str) -> Result<Vec<Note>> {
        let notes = self.store.scan(|n| n.is_accessible_by(user_id));
        tracing::debug!(user_id, result_count = notes.len(), "Accessible notes scan");
        Ok(notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notehub_core::Permission;

    fn kw(s: &str) -> Keyword {
        Keyword::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_find_by_keyword_is_per_user() {
        let repo = InMemoryNoteRepository::new();
        let mut a = Note::new("a", "A", "alice").unwrap();
        a.add_keyword("alice", kw("work")).unwrap();
        let mut b = Note::new("b", "B", "alice").unwrap();
        b.add_collaborator("alice", "bob", Permission::Read).unwrap();
        b.add_keyword("bob", kw("work")).unwrap();
        repo.save(&a).await.unwrap();
        repo.save(&b).await.unwrap();

        let found = repo.find_by_keyword_for_user("alice", &kw("work")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), "a");

        assert!(repo
            .find_by_keyword_for_user("carol", &kw("work"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_accessible_notes_owner_or_collaborator() {
        let repo = InMemoryNoteRepository::new();
        let mut shared = Note::new("shared", "S", "alice").unwrap();
        shared
            .add_collaborator("alice", "bob", Permission::Read)
            .unwrap();
        let own = Note::new("own", "O", "bob").unwrap();
        let other = Note::new("other", "X", "carol").unwrap();
        for n in [&shared, &own, &other] {
            repo.save(n).await.unwrap();
        }

        let ids: Vec<String> = repo
            .get_accessible_notes_by_user_id("bob")
            .await
            .unwrap()
            .iter()
            .map(|n| n.id().to_string())
            .collect();
        assert_eq!(ids, vec!["own", "shared"]);
    }
}
