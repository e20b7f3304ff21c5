//! Change events pushed to every live viewer of a note.
//!
//! Events serialize as a flat JSON object tagged by `type`, with camelCase
//! field names. Version fields carry the value stored *after* the write that
//! produced the event.
//!
//! ```json
//! {"type":"add_content","noteId":"n1","contentId":"c3","data":"milk",
//!  "contentType":"text","noteVersion":3,"contentVersion":0,"index":2}
//! ```

use serde::{Deserialize, Serialize};

use crate::{Content, ContentType, Note, Result};

/// A committed change to one note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum WebSocketEvent {
    /// A content block was inserted into the note. The block's fields are
    /// present when its record exists in the content store.
    AddContent {
        note_id: String,
        content_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<ContentType>,
        note_version: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_version: Option<u64>,
        index: usize,
    },
    /// A content block's data changed. The note version is unchanged.
    UpdateContent {
        note_id: String,
        content_id: String,
        data: String,
        content_type: ContentType,
        note_version: u64,
        content_version: u64,
    },
    DeleteContent {
        note_id: String,
        content_id: String,
        note_version: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    /// The title changed; `data` holds the new title.
    UpdateNote {
        note_id: String,
        data: String,
        note_version: u64,
    },
    /// The note is gone. Subscribers are closed right after this event.
    DeleteNote { note_id: String, note_version: u64 },
}

impl WebSocketEvent {
    pub fn add_content(
        note: &Note,
        content_id: &str,
        content: Option<&Content>,
        index: usize,
    ) -> Self {
        WebSocketEvent::AddContent {
            note_id: note.id().to_string(),
            content_id: content_id.to_string(),
            data: content.map(|c| c.data.clone()),
            content_type: content.map(|c| c.content_type),
            note_version: note.version(),
            content_version: content.map(|c| c.version),
            index,
        }
    }

    pub fn update_content(content: &Content, note_version: u64) -> Self {
        WebSocketEvent::UpdateContent {
            note_id: content.note_id.clone(),
            content_id: content.id.clone(),
            data: content.data.clone(),
            content_type: content.content_type,
            note_version,
            content_version: content.version,
        }
    }

    pub fn delete_content(note: &Note, content_id: &str, index: Option<usize>) -> Self {
        WebSocketEvent::DeleteContent {
            note_id: note.id().to_string(),
            content_id: content_id.to_string(),
            note_version: note.version(),
            index,
        }
    }

    pub fn update_note(note: &Note) -> Self {
        WebSocketEvent::UpdateNote {
            note_id: note.id().to_string(),
            data: note.title().to_string(),
            note_version: note.version(),
        }
    }

    pub fn delete_note(note_id: &str, note_version: u64) -> Self {
        WebSocketEvent::DeleteNote {
            note_id: note_id.to_string(),
            note_version,
        }
    }

    /// Wire name of the event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            WebSocketEvent::AddContent { .. } => "add_content",
            WebSocketEvent::UpdateContent { .. } => "update_content",
            WebSocketEvent::DeleteContent { .. } => "delete_content",
            WebSocketEvent::UpdateNote { .. } => "update_note",
            WebSocketEvent::DeleteNote { .. } => "delete_note",
        }
    }

    pub fn note_id(&self) -> &str {
        match self {
            WebSocketEvent::AddContent { note_id, .. }
            | WebSocketEvent::UpdateContent { note_id, .. }
            | WebSocketEvent::DeleteContent { note_id, .. }
            | WebSocketEvent::UpdateNote { note_id, .. }
            | WebSocketEvent::DeleteNote { note_id, .. } => note_id,
        }
    }

    pub fn note_version(&self) -> u64 {
        match self {
            WebSocketEvent::AddContent { note_version, .. }
            | WebSocketEvent::UpdateContent { note_version, .. }
            | WebSocketEvent::DeleteContent { note_version, .. }
            | WebSocketEvent::UpdateNote { note_version, .. }
            | WebSocketEvent::DeleteNote { note_version, .. } => *note_version,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
