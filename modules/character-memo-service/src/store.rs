//! Key-value persistence for character and memo documents.
//!
//! The store is a flat string namespace with `get`/`put` only — no
//! compare-and-swap, no range scan, no transactions. Every handler performs
//! a full read-modify-write of one key's JSON document; concurrent writers
//! to the same key can lose updates (last write wins).

use rusqlite::Result as SqliteResult;
use std::collections::HashMap;
use std::sync::Mutex;

/// The injected storage seam. Handlers only ever see this trait, so tests
/// swap in [`MemoryStore`] without touching SQLite.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, String>;
    fn put(&self, key: &str, value: &str) -> Result<(), String>;
}

/// SQLite-backed store: a single `kv` table keyed by the namespace string.
pub struct SqliteStore {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteStore {
    pub fn open(path: &str) -> SqliteResult<Self> {
        let conn = if path == ":memory:" {
            rusqlite::Connection::open_in_memory()?
        } else {
            rusqlite::Connection::open(path)?
        };
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_tables()?;
        Ok(store)
    }

    fn create_tables(&self) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT value FROM kv WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(format!("Store read failed: {}", e)),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<(), String> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![key, value],
        )
        .map_err(|e| format!("Store write failed: {}", e))?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, String> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), String> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(store: &dyn KeyValueStore) {
        assert_eq!(store.get("characters").unwrap(), None);
        store.put("characters", "[]").unwrap();
        assert_eq!(store.get("characters").unwrap(), Some("[]".to_string()));
        store.put("characters", "[{\"id\":\"aki\"}]").unwrap();
        assert_eq!(
            store.get("characters").unwrap(),
            Some("[{\"id\":\"aki\"}]".to_string())
        );
        assert_eq!(store.get("memos:aki").unwrap(), None);
    }

    #[test]
    fn memory_store_round_trip() {
        round_trip(&MemoryStore::new());
    }

    #[test]
    fn sqlite_store_round_trip_in_memory() {
        let store = SqliteStore::open(":memory:").unwrap();
        round_trip(&store);
    }

    #[test]
    fn sqlite_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.db");
        let path = path.to_str().unwrap();

        {
            let store = SqliteStore::open(path).unwrap();
            store.put("memos:aki", "[{\"memoId\":\"1\"}]").unwrap();
        }

        let store = SqliteStore::open(path).unwrap();
        assert_eq!(
            store.get("memos:aki").unwrap(),
            Some("[{\"memoId\":\"1\"}]".to_string())
        );
    }

    #[test]
    fn put_overwrites_existing_key() {
        let store = SqliteStore::open(":memory:").unwrap();
        store.put("k", "one").unwrap();
        store.put("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("two".to_string()));
    }
}
