//! JSON values under string keys, persisted in SQLite.
//!
//! [`Storage`] is the adapter the rest of the crate talks to. It never
//! returns an error: when the backing store cannot be opened, read or
//! written, it logs a warning and keeps serving from memory.

use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::data_dir;
use crate::error::StorageError;

/// Raw string key-value backend.
pub trait KeyValueStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_raw(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// SQLite `kv` table.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open `<data_dir>/mini25.db`.
    pub fn open_default() -> Result<Self, StorageError> {
        let dir = data_dir().map_err(|e| StorageError::DataDir(e.to_string()))?;
        Self::open(&dir.join("mini25.db"))
    }

    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
    }
}

impl KeyValueStore for SqliteStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_raw(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

/// Process-local backend.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    map: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.map.get(key).cloned())
    }

    fn set_raw(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Typed, infallible storage adapter.
///
/// Values the backend accepted are always read back from the backend, so
/// writes made by another process are visible. A write the backend rejected
/// is kept in an in-memory overlay and shadows the backend for the rest of
/// this process.
pub struct Storage {
    backend: Option<Box<dyn KeyValueStore>>,
    overlay: HashMap<String, String>,
}

impl Storage {
    /// Open the on-disk store, degrading to memory-only when unavailable.
    pub fn open_default() -> Self {
        match SqliteStore::open_default() {
            Ok(store) => Self::with_backend(store),
            Err(e) => {
                tracing::warn!(error = %e, "persistent storage unavailable, using memory only");
                Self::in_memory()
            }
        }
    }

    pub fn with_backend<S: KeyValueStore + 'static>(backend: S) -> Self {
        Self {
            backend: Some(Box::new(backend)),
            overlay: HashMap::new(),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            backend: None,
            overlay: HashMap::new(),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.backend.is_some()
    }

    /// Read `key`, returning `default` when it is absent or unreadable.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let raw = match self.overlay.get(key) {
            Some(raw) => Some(raw.clone()),
            None => self.read_backend(key),
        };
        let Some(raw) = raw else {
            return default;
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(source) => {
                let e = StorageError::Codec {
                    key: key.to_string(),
                    source,
                };
                tracing::warn!(error = %e, "discarding unreadable stored value");
                default
            }
        }
    }

    /// Write `value` under `key`.
    pub fn set<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(source) => {
                let e = StorageError::Codec {
                    key: key.to_string(),
                    source,
                };
                tracing::warn!(error = %e, "value not stored");
                return;
            }
        };
        if let Some(backend) = self.backend.as_mut() {
            match backend.set_raw(key, &raw) {
                Ok(()) => {
                    self.overlay.remove(key);
                    return;
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "persisting failed, keeping value in memory");
                }
            }
        }
        self.overlay.insert(key.to_string(), raw);
    }

    fn read_backend(&self, key: &str) -> Option<String> {
        let backend = self.backend.as_ref()?;
        match backend.get_raw(key) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "reading persistent storage failed");
                None
            }
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("persistent", &self.is_persistent())
            .field("overlay_keys", &self.overlay.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Backend that fails every call.
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get_raw(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::DataDir("disk unplugged".into()))
        }

        fn set_raw(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::DataDir("disk unplugged".into()))
        }
    }

    #[test]
    fn sqlite_kv_store() {
        let mut store = SqliteStore::open_memory().unwrap();
        assert!(store.get_raw("test").unwrap().is_none());
        store.set_raw("test", "hello").unwrap();
        assert_eq!(store.get_raw("test").unwrap().unwrap(), "hello");
        store.set_raw("test", "again").unwrap();
        assert_eq!(store.get_raw("test").unwrap().unwrap(), "again");
    }

    #[test]
    fn missing_key_yields_default() {
        let storage = Storage::with_backend(SqliteStore::open_memory().unwrap());
        let v: Vec<u32> = storage.get("nothing", vec![7]);
        assert_eq!(v, vec![7]);
    }

    #[test]
    fn typed_roundtrip() {
        let mut storage = Storage::with_backend(SqliteStore::open_memory().unwrap());
        storage.set("numbers", &vec![1, 2, 3]);
        assert_eq!(storage.get::<Vec<i32>>("numbers", vec![]), vec![1, 2, 3]);
    }

    #[test]
    fn persists_across_adapters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.db");
        {
            let mut storage = Storage::with_backend(SqliteStore::open(&path).unwrap());
            storage.set("greeting", "hi");
        }
        let storage = Storage::with_backend(SqliteStore::open(&path).unwrap());
        assert_eq!(storage.get("greeting", String::new()), "hi");
    }

    #[test]
    fn broken_backend_falls_back_to_memory() {
        let mut storage = Storage::with_backend(BrokenStore);
        assert_eq!(storage.get("k", 5u8), 5);
        storage.set("k", &9u8);
        assert_eq!(storage.get("k", 5u8), 9);
    }

    #[test]
    fn sees_writes_from_another_adapter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.db");
        let mut first = Storage::with_backend(SqliteStore::open(&path).unwrap());
        let mut second = Storage::with_backend(SqliteStore::open(&path).unwrap());
        first.set("count", &1u32);
        second.set("count", &2u32);
        assert_eq!(first.get("count", 0u32), 2);
    }

    #[test]
    fn corrupt_value_yields_default() {
        let mut backend = MemoryStore::new();
        backend.set_raw("k", "{not json").unwrap();
        let storage = Storage::with_backend(backend);
        assert_eq!(storage.get("k", 1u32), 1);
    }

    #[test]
    fn unopenable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let result = SqliteStore::open(dir.path());
        assert!(result.is_err());
    }
}
