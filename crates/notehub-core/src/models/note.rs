use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::defaults::APPEND_INDEX;
use crate::{ids, Error, Keyword, Permission, Result};

/// Where a content id goes in a note's ordered list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InsertPosition {
    /// After the last block.
    #[default]
    Append,
    /// Before the block currently at this index; `len` is also accepted.
    At(usize),
}

impl InsertPosition {
    /// Interpret a raw client index. `-1` appends; other negatives are out of bounds.
    pub fn from_index(index: i64) -> Result<Self> {
        if index == APPEND_INDEX {
            return Ok(InsertPosition::Append);
        }
        usize::try_from(index)
            .map(InsertPosition::At)
            .map_err(|_| Error::IndexOutOfBounds { index, len: 0 })
    }
}

/// The note aggregate.
///
/// Fields are private: every change goes through a method that keeps the
/// invariants intact.
///
/// - `owner_id` never appears in `collaborators`
/// - `content_ids` holds each id once
/// - a user's keyword set is dropped together with their grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    id: String,
    owner_id: String,
    title: String,
    version: u64,
    content_ids: Vec<String>,
    keywords: BTreeMap<String, BTreeSet<Keyword>>,
    collaborators: BTreeMap<String, Permission>,
}

impl Note {
    /// Create a note at version 0. An empty `id` is replaced with a generated one.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        owner_id: impl Into<String>,
    ) -> Result<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(Error::EmptyTitle);
        }
        let owner_id = owner_id.into();
        ids::require(&owner_id, "owner")?;

        Ok(Self {
            id: ids::or_generate(id),
            owner_id,
            title,
            version: 0,
            content_ids: Vec::new(),
            keywords: BTreeMap::new(),
            collaborators: BTreeMap::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn content_ids(&self) -> &[String] {
        &self.content_ids
    }

    pub fn keywords(&self) -> &BTreeMap<String, BTreeSet<Keyword>> {
        &self.keywords
    }

    pub fn keywords_for(&self, user_id: &str) -> Option<&BTreeSet<Keyword>> {
        self.keywords.get(user_id)
    }

    pub fn collaborators(&self) -> &BTreeMap<String, Permission> {
        &self.collaborators
    }

    pub fn permission_for(&self, user_id: &str) -> Option<Permission> {
        self.collaborators.get(user_id).copied()
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    /// Owner or any collaborator grant.
    pub fn is_accessible_by(&self, user_id: &str) -> bool {
        self.is_owner(user_id) || self.collaborators.contains_key(user_id)
    }

    pub fn has_keyword(&self, user_id: &str, keyword: &Keyword) -> bool {
        self.keywords
            .get(user_id)
            .is_some_and(|set| set.contains(keyword))
    }

    pub fn contains_content(&self, content_id: &str) -> bool {
        self.content_ids.iter().any(|id| id == content_id)
    }

    pub fn change_title(&mut self, title: impl Into<String>) -> Result<()> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(Error::EmptyTitle);
        }
        self.title = title;
        Ok(())
    }

    /// Insert a content id and return the index it landed at.
    pub fn add_content_id(
        &mut self,
        content_id: impl Into<String>,
        position: InsertPosition,
    ) -> Result<usize> {
        let content_id = content_id.into();
        ids::require(&content_id, "content")?;
        if self.contains_content(&content_id) {
            return Err(Error::DuplicateContentId(content_id));
        }

        let len = self.content_ids.len();
        let index = match position {
            InsertPosition::Append => len,
            InsertPosition::At(i) if i <= len => i,
            InsertPosition::At(i) => {
                return Err(Error::IndexOutOfBounds {
                    index: i64::try_from(i).unwrap_or(i64::MAX),
                    len,
                })
            }
        };
        self.content_ids.insert(index, content_id);
        Ok(index)
    }

    /// Remove a content id and return the index it occupied.
    pub fn remove_content_id(&mut self, content_id: &str) -> Result<usize> {
        let index = self
            .content_ids
            .iter()
            .position(|id| id == content_id)
            .ok_or_else(|| Error::ContentNotFound(content_id.to_string()))?;
        self.content_ids.remove(index);
        Ok(index)
    }

    /// Grant or replace `target_id`'s permission. Owner only.
    pub fn add_collaborator(
        &mut self,
        caller_id: &str,
        target_id: &str,
        permission: Permission,
    ) -> Result<()> {
        self.ensure_owner(caller_id, "share")?;
        ids::require(target_id, "user")?;
        if self.is_owner(target_id) {
            return Err(Error::InvalidCollaborator(format!(
                "{target_id} owns note {}",
                self.id
            )));
        }
        self.collaborators.insert(target_id.to_string(), permission);
        Ok(())
    }

    /// Revoke `target_id`'s grant and drop their keywords. Owner only.
    pub fn remove_collaborator(&mut self, caller_id: &str, target_id: &str) -> Result<()> {
        self.ensure_owner(caller_id, "revoke access to")?;
        if self.collaborators.remove(target_id).is_none() {
            return Err(Error::UserNotFound(target_id.to_string()));
        }
        self.keywords.remove(target_id);
        Ok(())
    }

    /// Tag the note for one user. Keywords are private to the user and need
    /// no grant. Returns false when the user already had this keyword.
    pub fn add_keyword(&mut self, user_id: &str, keyword: Keyword) -> Result<bool> {
        ids::require(user_id, "user")?;
        Ok(self
            .keywords
            .entry(user_id.to_string())
            .or_default()
            .insert(keyword))
    }

    pub fn remove_keyword(&mut self, user_id: &str, keyword: &Keyword) -> Result<()> {
        let set = self
            .keywords
            .get_mut(user_id)
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;
        if !set.remove(keyword) {
            return Err(Error::KeywordNotFound(keyword.to_string()));
        }
        if set.is_empty() {
            self.keywords.remove(user_id);
        }
        Ok(())
    }

    fn ensure_owner(&self, caller_id: &str, action: &str) -> Result<()> {
        if !self.is_owner(caller_id) {
            return Err(Error::PermissionDenied(format!(
                "{caller_id} cannot {action} note {}",
                self.id
            )));
        }
        Ok(())
    }

    /// Used by stores when a save is accepted.
    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}
