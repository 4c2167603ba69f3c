//! SQLite-backed key-value store.
//!
//! Single table `kv_state(namespace, key, value, updated_at)`. The connection
//! is guarded by a mutex; every operation is one statement.

use std::path::Path;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use super::KvStore;
use crate::error::StoreError;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv_state (
    namespace TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (namespace, key)
)";

pub struct SqliteStore {
    conn: Mutex<Connection>,
    namespace: String,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: &Path, namespace: &str) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn, namespace)
    }

    pub fn open_in_memory(namespace: &str) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, namespace)
    }

    fn with_connection(conn: Connection, namespace: &str) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            namespace: namespace.to_string(),
        })
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM kv_state WHERE namespace = ?1 AND key = ?2",
                params![self.namespace, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO kv_state (namespace, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(namespace, key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at",
            params![self.namespace, key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_overwrites_value() {
        let store = SqliteStore::open_in_memory("default").expect("open");
        store.put("ledger", "[1]").expect("put");
        store.put("ledger", "[1,2]").expect("put");
        assert_eq!(store.get("ledger").expect("get"), Some("[1,2]".to_string()));
    }

    #[test]
    fn test_file_db_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bidwatch.db");
        {
            let store = SqliteStore::open(&path, "default").expect("open");
            store.put("preferences", "{}").expect("put");
        }
        let reopened = SqliteStore::open(&path, "default").expect("reopen");
        assert_eq!(reopened.get("preferences").expect("get"), Some("{}".to_string()));
        let other = SqliteStore::open(&path, "other").expect("open other");
        assert_eq!(other.get("preferences").expect("get"), None);
    }
}
