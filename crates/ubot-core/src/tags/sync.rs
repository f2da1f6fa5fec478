//! Keeps the registry's dynamic command set in line with the tag store.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::{
    commands::{CommandContext, CommandRegistry},
    errors::Error,
    messaging::types::Embed,
    tags::{normalize_name, NewTag, Tag, TagStore},
    Result,
};

pub struct TagSynchronizer {
    store: Arc<dyn TagStore>,
    registry: Arc<CommandRegistry>,
    /// Serializes load + swap so an older listing never overwrites a newer one.
    rebuild_lock: Mutex<()>,
    background: TaskTracker,
}

impl TagSynchronizer {
    pub fn new(store: Arc<dyn TagStore>, registry: Arc<CommandRegistry>) -> Self {
        Self {
            store,
            registry,
            rebuild_lock: Mutex::new(()),
            background: TaskTracker::new(),
        }
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// Reload every tag and install them as the registry's dynamic set.
    /// Returns the number of tags loaded.
    pub async fn rebuild(&self) -> Result<usize> {
        let _guard = self.rebuild_lock.lock().await;
        let tags = self.store.list_tags().await?;
        let count = tags.len();
        self.registry.replace_dynamic_set(tags);
        debug!(tags = count, "rebuilt tag commands");
        Ok(count)
    }

    /// Persist a new tag, then rebuild. Nothing is rebuilt if validation or
    /// persistence fails.
    pub async fn add_tag(&self, tag: NewTag) -> Result<Tag> {
        let tag = NewTag {
            name: self.check_trigger(&tag.name)?,
            aliases: tag
                .aliases
                .iter()
                .map(|a| self.check_trigger(a))
                .collect::<Result<Vec<_>>>()?,
            ..tag
        };

        let stored = self.store.insert_tag(tag).await?;
        info!(tag = %stored.name, owner = %stored.owner_id, "tag added");
        self.rebuild().await?;
        Ok(stored)
    }

    /// Delete the tag that `trigger` (name or alias) refers to, then rebuild.
    pub async fn remove_tag(&self, trigger: &str) -> Result<Tag> {
        let tag = self
            .store
            .find_tag(trigger)
            .await?
            .ok_or_else(|| Error::TagNotFound(trigger.to_string()))?;

        self.store.delete_tag(tag.id).await?;
        info!(tag = %tag.name, "tag removed");
        self.rebuild().await?;
        Ok(tag)
    }

    /// Attach another trigger to an existing tag, then rebuild.
    pub async fn add_alias(&self, trigger: &str, alias: &str) -> Result<Tag> {
        let alias = self.check_trigger(alias)?;
        let tag = self
            .store
            .find_tag(trigger)
            .await?
            .ok_or_else(|| Error::TagNotFound(trigger.to_string()))?;

        self.store.add_alias(tag.id, &alias).await?;
        info!(tag = %tag.name, alias = %alias, "tag alias added");
        self.rebuild().await?;
        self.store
            .find_tag(&alias)
            .await?
            .ok_or_else(|| Error::TagNotFound(alias))
    }

    /// Fresh store lookup (use counters in the registry snapshot are stale).
    pub async fn find(&self, trigger: &str) -> Result<Option<Tag>> {
        self.store.find_tag(trigger).await
    }

    pub async fn list(&self) -> Result<Vec<Tag>> {
        self.store.list_tags().await
    }

    /// Render `tag` into the invoking channel, then count the use in the
    /// background.
    pub async fn invoke(&self, ctx: &CommandContext, tag: &Tag) -> Result<()> {
        let mut embed = Embed::new(&tag.name, &tag.content);
        match ctx
            .state
            .messenger
            .resolve_user(ctx.channel_id(), tag.owner_id)
            .await
        {
            Ok(Some(owner)) => embed = embed.with_author(owner.name, owner.avatar_url),
            Ok(None) => {}
            Err(e) => debug!(tag = %tag.name, owner = %tag.owner_id, "owner lookup failed: {e}"),
        }

        ctx.send_embed(&embed).await?;
        self.on_use(tag);
        Ok(())
    }

    /// Fire-and-forget use counter increment. Failures are only logged.
    pub fn on_use(&self, tag: &Tag) {
        let store = self.store.clone();
        let (id, name) = (tag.id, tag.name.clone());
        self.background.spawn(async move {
            if let Err(e) = store.increment_uses(id).await {
                warn!(tag = %name, "failed to record tag use: {e}");
            }
        });
    }

    /// Wait for outstanding background work (use counters) to finish.
    pub async fn settle(&self) {
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }

    fn check_trigger(&self, raw: &str) -> Result<String> {
        let name = normalize_name(raw)?;
        if self.registry.is_static(&name) {
            return Err(Error::TagExists(name));
        }
        Ok(name)
    }
}
