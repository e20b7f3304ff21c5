//! Identifier helpers.
//!
//! Ids are opaque strings throughout notehub. Generated ids are UUIDv7, so
//! they sort by creation time.

use crate::{Error, Result};
use uuid::Uuid;

/// Generate a new time-ordered id.
#[inline]
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Return `id` unchanged, or a freshly generated id when it is empty.
pub fn or_generate(id: impl Into<String>) -> String {
    let id = id.into();
    if id.is_empty() {
        new_id()
    } else {
        id
    }
}

/// Reject empty identifiers. `what` names the id in the error ("note", "user", ...).
pub fn require(id: &str, what: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(Error::InvalidId(format!("{what} id must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_is_v7() {
        let id = new_id();
        let parsed = Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }

    #[test]
    fn test_or_generate_keeps_supplied_id() {
        assert_eq!(or_generate("note-1"), "note-1");
        assert!(!or_generate("").is_empty());
    }

    #[test]
    fn test_require_rejects_blank() {
        assert!(matches!(require("", "note"), Err(Error::InvalidId(_))));
        assert!(matches!(require("   ", "user"), Err(Error::InvalidId(_))));
        assert!(require("n1", "note").is_ok());
    }
}
