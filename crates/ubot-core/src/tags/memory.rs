//! In-process tag store, used by tests and dry runs.

use std::{
    collections::BTreeMap,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    errors::Error,
    tags::{NewTag, Tag, TagStore},
    Result,
};

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    tags: BTreeMap<i64, Tag>,
    /// When set, every mutating call fails with this message.
    fail_writes: Option<String>,
}

impl Inner {
    fn owner_of(&self, trigger: &str) -> Option<i64> {
        self.tags
            .values()
            .find(|t| t.triggers().any(|x| x.eq_ignore_ascii_case(trigger.trim())))
            .map(|t| t.id)
    }

    fn check_writable(&self) -> Result<()> {
        match &self.fail_writes {
            Some(msg) => Err(Error::Storage(msg.clone())),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryTagStore {
    inner: Mutex<Inner>,
}

impl MemoryTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail (`None` restores normal behavior).
    pub fn fail_writes(&self, message: Option<&str>) {
        self.lock().fail_writes = message.map(|m| m.to_string());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TagStore for MemoryTagStore {
    async fn list_tags(&self) -> Result<Vec<Tag>> {
        Ok(self.lock().tags.values().cloned().collect())
    }

    async fn find_tag(&self, trigger: &str) -> Result<Option<Tag>> {
        let inner = self.lock();
        Ok(inner
            .owner_of(trigger)
            .and_then(|id| inner.tags.get(&id).cloned()))
    }

    async fn insert_tag(&self, tag: NewTag) -> Result<Tag> {
        let mut inner = self.lock();
        inner.check_writable()?;
        for trigger in std::iter::once(&tag.name).chain(tag.aliases.iter()) {
            if inner.owner_of(trigger).is_some() {
                return Err(Error::TagExists(trigger.clone()));
            }
        }

        inner.next_id += 1;
        let stored = Tag {
            id: inner.next_id,
            name: tag.name,
            content: tag.content,
            owner_id: tag.owner_id,
            uses: 0,
            aliases: tag.aliases,
            created_at: Utc::now(),
        };
        inner.tags.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete_tag(&self, id: i64) -> Result<()> {
        let mut inner = self.lock();
        inner.check_writable()?;
        inner
            .tags
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::TagNotFound(format!("#{id}")))
    }

    async fn add_alias(&self, id: i64, alias: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.check_writable()?;
        if inner.owner_of(alias).is_some() {
            return Err(Error::TagExists(alias.to_string()));
        }
        let tag = inner
            .tags
            .get_mut(&id)
            .ok_or_else(|| Error::TagNotFound(format!("#{id}")))?;
        tag.aliases.push(alias.to_string());
        Ok(())
    }

    async fn increment_uses(&self, id: i64) -> Result<()> {
        let mut inner = self.lock();
        inner.check_writable()?;
        if let Some(tag) = inner.tags.get_mut(&id) {
            tag.uses += 1;
        }
        Ok(())
    }
}
