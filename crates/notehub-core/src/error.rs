//! Error types for notehub.

use thiserror::Error;

/// Result type alias using notehub's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for notehub operations.
///
/// Store-level kinds (`NotFound`, `Conflict`) and aggregate-level kinds
/// (`ContentNotFound`, `UserNotFound`, ...) are kept distinct so callers can
/// tell "re-read and retry" apart from "give up".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Entity absent from its store
    #[error("Not found: {0}")]
    NotFound(String),

    /// Empty or malformed identifier supplied by the caller
    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// Optimistic version mismatch
    #[error("Version conflict on {id}: expected {expected}, found {found}")]
    Conflict {
        id: String,
        expected: u64,
        found: u64,
    },

    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("Keyword must not be empty")]
    EmptyKeyword,

    /// Content id is not part of the note
    #[error("Content not found in note: {0}")]
    ContentNotFound(String),

    /// User has no grant or keyword set on the note
    #[error("User not found on note: {0}")]
    UserNotFound(String),

    #[error("Keyword not found: {0}")]
    KeywordNotFound(String),

    /// Non-owner attempted an owner-only action
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Index {index} out of bounds for {len} content items")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("Unsupported permission type: {0}")]
    UnsupportedPermissionType(String),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// The owner cannot hold a collaborator grant on their own note
    #[error("Invalid collaborator: {0}")]
    InvalidCollaborator(String),

    #[error("Content already present in note: {0}")]
    DuplicateContentId(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub fn conflict(id: impl Into<String>, expected: u64, found: u64) -> Self {
        Error::Conflict {
            id: id.into(),
            expected,
            found,
        }
    }

    /// True for optimistic concurrency failures; the caller should re-read and retry.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
