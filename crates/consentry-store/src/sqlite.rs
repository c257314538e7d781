//! SQLite-backed key-value storage.
//!
//! One table, one row per slot. Scoped handles share a connection and prefix
//! every key, which lets a server keep a separate consent slot per visitor.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

use crate::schema::SCHEMA_SQL;
use crate::storage::KeyValueStorage;
use consentry_core::{Error, Result};

/// SQLite key-value store.
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
    prefix: String,
}

impl SqliteStorage {
    /// Open or create the database at `db_path`.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Storage(e.to_string()))?;
        }

        let conn = Connection::open(&db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Self::init(conn, db_path)
    }

    /// In-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::Database(e.to_string()))?;
        Self::init(conn, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, db_path: PathBuf) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
            prefix: String::new(),
        };
        info!(
            "SqliteStorage initialized: {} slots, path={}",
            store.count_all()?,
            store.db_path.display()
        );
        Ok(store)
    }

    /// A handle whose keys live under `scope`. Shares this connection.
    pub fn scoped(&self, scope: &str) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            db_path: self.db_path.clone(),
            prefix: format!("{}{}:", self.prefix, scope),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Number of stored rows across every scope.
    pub fn count_all(&self) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count)
    }
}

impl KeyValueStorage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .prepare_cached("SELECT value FROM kv WHERE key = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![self.full_key(key)], |row| row.get(0))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .execute(params![self.full_key(key), value, now])
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM kv WHERE key = ?1", params![self.full_key(key)])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
