// SQLite-backed store
// One table of (scope, key, JSON value) rows, kept in ~/.scribe/scribe.db by default

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use super::{Scope, Store};
use crate::error::{StorageError, StorageResult};

pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Database that lives only as long as this value
    pub fn in_memory() -> StorageResult<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    /// Default database location: ~/.scribe/scribe.db
    pub fn default_path() -> StorageResult<PathBuf> {
        let home = std::env::var("HOME")
            .map_err(|_| StorageError::Backend("HOME not set".to_string()))?;
        Ok(PathBuf::from(home).join(".scribe").join("scribe.db"))
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> StorageResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                scope TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (scope, key)
            )",
            [],
        )?;

        Ok(SqliteStore {
            conn: Mutex::new(conn),
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Backend("database lock poisoned".to_string()))
    }
}

impl Store for SqliteStore {
    fn get(&self, scope: Scope, key: &str) -> StorageResult<Option<Value>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM kv WHERE scope = ?1 AND key = ?2",
                params![scope.as_str(), key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    fn set(&self, scope: Scope, key: &str, value: Value) -> StorageResult<()> {
        let text = serde_json::to_string(&value)?;
        self.lock()?.execute(
            "INSERT INTO kv (scope, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope, key) DO UPDATE SET value = excluded.value",
            params![scope.as_str(), key, text],
        )?;
        Ok(())
    }

    fn remove(&self, scope: Scope, key: &str) -> StorageResult<()> {
        self.lock()?.execute(
            "DELETE FROM kv WHERE scope = ?1 AND key = ?2",
            params![scope.as_str(), key],
        )?;
        Ok(())
    }

    fn clear(&self, scope: Scope) -> StorageResult<()> {
        self.lock()?
            .execute("DELETE FROM kv WHERE scope = ?1", params![scope.as_str()])?;
        Ok(())
    }

    fn entries(&self, scope: Scope) -> StorageResult<BTreeMap<String, Value>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key, value FROM kv WHERE scope = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![scope.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut entries = BTreeMap::new();
        for row in rows {
            let (key, text) = row?;
            entries.insert(key, serde_json::from_str(&text)?);
        }
        Ok(entries)
    }
}
