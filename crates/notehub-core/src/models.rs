//! Core data models for notehub.
//!
//! These types are shared across all notehub crates and represent the
//! domain entities: the `Note` aggregate, its `Content` blocks, and the
//! `Keyword` / `Permission` value types.

mod content;
mod keyword;
mod note;
mod permission;

pub use content::{Content, ContentType};
pub use keyword::Keyword;
pub use note::{InsertPosition, Note};
pub use permission::Permission;
