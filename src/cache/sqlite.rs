use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{CacheEntry, CacheStore};
use crate::paths;

/// [`CacheStore`] backed by a `SQLite` database file.
pub struct SqliteCacheStore {
    db_path: PathBuf,
}

impl SqliteCacheStore {
    /// Opens the store at `$XDG_CACHE_HOME/seltl/cache.db`.
    pub fn new() -> Result<Self> {
        Self::open(paths::cache_dir()?.join("cache.db"))
    }

    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }

        let store = Self { db_path };
        store.init_db()?;

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn init_db(&self) -> Result<()> {
        let conn = self.connect()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache_entries (
                source_text TEXT PRIMARY KEY NOT NULL,
                translated_text TEXT NOT NULL,
                touched_at_ms INTEGER NOT NULL
            )",
            [],
        )
        .context("Failed to create cache_entries table")?;

        Ok(())
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .with_context(|| format!("Failed to open cache database: {}", self.db_path.display()))
    }
}

impl CacheStore for SqliteCacheStore {
    fn load(&self) -> Result<HashMap<String, CacheEntry>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT source_text, translated_text, touched_at_ms FROM cache_entries")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut entries = HashMap::new();
        for row in rows {
            let (source_text, translated_text, touched_at_ms) =
                row.context("Failed to read cache row")?;
            entries.insert(
                source_text,
                CacheEntry::from_millis(touched_at_ms, translated_text),
            );
        }

        Ok(entries)
    }

    fn save(&self, entries: &HashMap<String, CacheEntry>) -> Result<()> {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction()
            .context("Failed to begin cache transaction")?;

        tx.execute("DELETE FROM cache_entries", [])
            .context("Failed to clear cache table")?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO cache_entries (source_text, translated_text, touched_at_ms)
                 VALUES (?1, ?2, ?3)",
            )?;
            for (source_text, entry) in entries {
                stmt.execute(params![
                    source_text,
                    entry.value,
                    entry.touched_at_millis()
                ])
                .context("Failed to insert cache entry")?;
            }
        }

        tx.commit().context("Failed to commit cache transaction")?;

        Ok(())
    }
}
