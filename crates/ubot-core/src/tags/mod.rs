//! Tags: named canned replies created at runtime, persisted, and exposed as
//! dynamic commands.

pub mod memory;
pub mod sqlite;
pub mod store;
pub mod sync;

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::{domain::UserId, errors::Error, Result};

pub use memory::MemoryTagStore;
pub use sqlite::SqliteTagStore;
pub use store::TagStore;
pub use sync::TagSynchronizer;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub content: String,
    pub owner_id: UserId,
    pub uses: i64,
    /// Alias triggers, in insertion order.
    pub aliases: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    /// Name followed by aliases.
    pub fn triggers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(|a| a.as_str()))
    }
}

/// A tag that has not been persisted yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTag {
    pub name: String,
    pub content: String,
    pub owner_id: UserId,
    pub aliases: Vec<String>,
}

impl NewTag {
    pub fn new(name: &str, content: &str, owner_id: UserId) -> Self {
        Self {
            name: name.to_string(),
            content: content.to_string(),
            owner_id,
            aliases: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }
}

pub const MAX_NAME_LEN: usize = 32;

/// Normalize and validate a tag name or alias: one lowercase word of
/// `[a-z0-9_-]`, at most 32 characters.
pub fn normalize_name(raw: &str) -> Result<String> {
    static NAME_RE: OnceLock<Regex> = OnceLock::new();
    let re = NAME_RE.get_or_init(|| Regex::new(r"^[a-z0-9_-]+$").expect("valid regex"));

    let name = raw.trim().to_lowercase();
    let invalid = |reason: &str| Error::InvalidTagName {
        name: raw.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(invalid("name is longer than 32 characters"));
    }
    if !re.is_match(&name) {
        return Err(invalid("only letters, digits, `-` and `_` are allowed"));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_lowercased_and_checked() {
        assert_eq!(normalize_name("  Greet ").unwrap(), "greet");
        assert_eq!(normalize_name("a_b-1").unwrap(), "a_b-1");
        assert!(normalize_name("").is_err());
        assert!(normalize_name("two words").is_err());
        assert!(normalize_name("emoji😀").is_err());
        assert!(normalize_name(&"x".repeat(33)).is_err());
        assert!(normalize_name(&"x".repeat(32)).is_ok());
    }

    #[test]
    fn triggers_list_name_first() {
        let tag = Tag {
            id: 1,
            name: "greet".to_string(),
            content: String::new(),
            owner_id: UserId(1),
            uses: 0,
            aliases: vec!["hi".to_string(), "hey".to_string()],
            created_at: Utc::now(),
        };
        assert_eq!(tag.triggers().collect::<Vec<_>>(), vec!["greet", "hi", "hey"]);
    }
}
