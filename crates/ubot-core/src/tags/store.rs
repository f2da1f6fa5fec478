use async_trait::async_trait;

use crate::{
    tags::{NewTag, Tag},
    Result,
};

/// Persistence port for tags. Aliases are always loaded with their tag.
///
/// Lookups by trigger are case-insensitive and match names and aliases.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// All tags ordered by id.
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    async fn find_tag(&self, trigger: &str) -> Result<Option<Tag>>;

    /// Fails with `Error::TagExists` if the name or an alias is already a
    /// trigger of another tag.
    async fn insert_tag(&self, tag: NewTag) -> Result<Tag>;

    /// Fails with `Error::TagNotFound` if no tag has this id.
    async fn delete_tag(&self, id: i64) -> Result<()>;

    async fn add_alias(&self, id: i64, alias: &str) -> Result<()>;

    /// Atomic `uses = uses + 1`.
    async fn increment_uses(&self, id: i64) -> Result<()>;
}
