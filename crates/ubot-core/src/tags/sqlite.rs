//! SQLite-backed tag store.

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::info;

use crate::{
    domain::UserId,
    errors::Error,
    tags::{NewTag, Tag, TagStore},
    Result,
};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE COLLATE NOCASE,
        content TEXT NOT NULL,
        owner_id INTEGER NOT NULL,
        uses INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS tag_aliases (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
        alias TEXT NOT NULL UNIQUE COLLATE NOCASE
    );
    CREATE INDEX IF NOT EXISTS idx_tag_aliases_tag ON tag_aliases(tag_id);
";

/// Tag store over a single SQLite connection. Blocking calls run on the
/// blocking thread pool.
#[derive(Clone)]
pub struct SqliteTagStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTagStore {
    /// Open (or create) the database at `path` in WAL mode.
    pub fn open(path: &Path) -> Result<Self> {
        info!("opening tag database at {}", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::init(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::Storage("connection mutex poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| Error::Storage(format!("storage task failed: {e}")))?
    }
}

#[async_trait]
impl TagStore for SqliteTagStore {
    async fn list_tags(&self) -> Result<Vec<Tag>> {
        self.with_conn(|conn| {
            let mut aliases: HashMap<i64, Vec<String>> = HashMap::new();
            {
                let mut stmt =
                    conn.prepare("SELECT tag_id, alias FROM tag_aliases ORDER BY id")?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                })?;
                for row in rows {
                    let (tag_id, alias) = row?;
                    aliases.entry(tag_id).or_default().push(alias);
                }
            }

            let mut stmt = conn.prepare(
                "SELECT id, name, content, owner_id, uses, created_at FROM tags ORDER BY id",
            )?;
            let rows = stmt.query_map([], read_tag_row)?;
            let mut out = Vec::new();
            for row in rows {
                let mut tag = row?;
                tag.aliases = aliases.remove(&tag.id).unwrap_or_default();
                out.push(tag);
            }
            Ok(out)
        })
        .await
    }

    async fn find_tag(&self, trigger: &str) -> Result<Option<Tag>> {
        let trigger = trigger.trim().to_string();
        self.with_conn(move |conn| {
            let Some(id) = trigger_owner(conn, &trigger)? else {
                return Ok(None);
            };
            load_tag(conn, id)
        })
        .await
    }

    async fn insert_tag(&self, tag: NewTag) -> Result<Tag> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            for trigger in std::iter::once(&tag.name).chain(tag.aliases.iter()) {
                if trigger_owner(&tx, trigger)?.is_some() {
                    return Err(Error::TagExists(trigger.clone()));
                }
            }

            let created_at = Utc::now();
            tx.execute(
                "INSERT INTO tags (name, content, owner_id, uses, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4)",
                params![tag.name, tag.content, tag.owner_id.0, created_at.to_rfc3339()],
            )?;
            let id = tx.last_insert_rowid();
            for alias in &tag.aliases {
                insert_alias(&tx, id, alias)?;
            }
            tx.commit()?;

            load_tag(conn, id)?.ok_or_else(|| Error::TagNotFound(tag.name.clone()))
        })
        .await
    }

    async fn delete_tag(&self, id: i64) -> Result<()> {
        self.with_conn(move |conn| {
            let changed = conn.execute("DELETE FROM tags WHERE id = ?1", params![id])?;
            if changed == 0 {
                return Err(Error::TagNotFound(format!("#{id}")));
            }
            Ok(())
        })
        .await
    }

    async fn add_alias(&self, id: i64, alias: &str) -> Result<()> {
        let alias = alias.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let exists: Option<i64> = tx
                .query_row("SELECT id FROM tags WHERE id = ?1", params![id], |r| r.get(0))
                .optional()?;
            if exists.is_none() {
                return Err(Error::TagNotFound(format!("#{id}")));
            }
            if trigger_owner(&tx, &alias)?.is_some() {
                return Err(Error::TagExists(alias));
            }
            insert_alias(&tx, id, &alias)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn increment_uses(&self, id: i64) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute("UPDATE tags SET uses = uses + 1 WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
    }
}

fn read_tag_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tag> {
    let created_at: String = row.get(5)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        content: row.get(2)?,
        owner_id: UserId(row.get(3)?),
        uses: row.get(4)?,
        aliases: Vec::new(),
        created_at,
    })
}

fn load_tag(conn: &Connection, id: i64) -> Result<Option<Tag>> {
    let tag = conn
        .query_row(
            "SELECT id, name, content, owner_id, uses, created_at FROM tags WHERE id = ?1",
            params![id],
            read_tag_row,
        )
        .optional()?;
    let Some(mut tag) = tag else {
        return Ok(None);
    };

    let mut stmt = conn.prepare("SELECT alias FROM tag_aliases WHERE tag_id = ?1 ORDER BY id")?;
    let aliases = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
    for alias in aliases {
        tag.aliases.push(alias?);
    }
    Ok(Some(tag))
}

/// Id of the tag whose name or alias equals `trigger` (case-insensitive).
fn trigger_owner(conn: &Connection, trigger: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM tags WHERE name = ?1
             UNION ALL
             SELECT tag_id FROM tag_aliases WHERE alias = ?1
             LIMIT 1",
            params![trigger],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn insert_alias(tx: &Transaction<'_>, id: i64, alias: &str) -> Result<()> {
    tx.execute(
        "INSERT INTO tag_aliases (tag_id, alias) VALUES (?1, ?2)",
        params![id, alias],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteTagStore {
        SqliteTagStore::open_in_memory().unwrap()
    }

    #[tokio::test]
    async fn insert_and_list_with_aliases() {
        let store = store();
        let greet = store
            .insert_tag(NewTag::new("greet", "Hello", UserId(7)).with_alias("hi"))
            .await
            .unwrap();
        store
            .insert_tag(NewTag::new("bye", "Goodbye", UserId(8)))
            .await
            .unwrap();
        store.add_alias(greet.id, "hey").await.unwrap();

        let tags = store.list_tags().await.unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "greet");
        assert_eq!(tags[0].aliases, vec!["hi", "hey"]);
        assert_eq!(tags[0].owner_id, UserId(7));
        assert!(tags[1].aliases.is_empty());
    }

    #[tokio::test]
    async fn triggers_are_unique_across_names_and_aliases() {
        let store = store();
        store
            .insert_tag(NewTag::new("greet", "Hello", UserId(1)).with_alias("hi"))
            .await
            .unwrap();

        for dup in [
            NewTag::new("GREET", "x", UserId(1)),
            NewTag::new("hi", "x", UserId(1)),
            NewTag::new("other", "x", UserId(1)).with_alias("greet"),
        ] {
            let err = store.insert_tag(dup).await.unwrap_err();
            assert!(matches!(err, Error::TagExists(_)), "{err}");
        }
        // The failed insert left nothing behind.
        assert!(store.find_tag("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_matches_aliases_case_insensitively() {
        let store = store();
        store
            .insert_tag(NewTag::new("greet", "Hello", UserId(1)).with_alias("hi"))
            .await
            .unwrap();
        assert_eq!(store.find_tag("HI").await.unwrap().unwrap().name, "greet");
        assert!(store.find_tag("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_cascades_aliases() {
        let store = store();
        let tag = store
            .insert_tag(NewTag::new("greet", "Hello", UserId(1)).with_alias("hi"))
            .await
            .unwrap();
        store.delete_tag(tag.id).await.unwrap();

        assert!(store.find_tag("hi").await.unwrap().is_none());
        assert!(matches!(
            store.delete_tag(tag.id).await,
            Err(Error::TagNotFound(_))
        ));
        // The alias is free again.
        store
            .insert_tag(NewTag::new("hi", "again", UserId(1)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let store = store();
        let tag = store
            .insert_tag(NewTag::new("greet", "Hello", UserId(1)))
            .await
            .unwrap();

        let id = tag.id;
        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.increment_uses(id).await.unwrap()
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.find_tag("greet").await.unwrap().unwrap().uses, 20);
    }
}
