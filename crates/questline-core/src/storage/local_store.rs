//! Namespaced key/value cache backed by SQLite.
//!
//! This is the durable copy of everything the UI reads. Reads never fail:
//! a missing key or a corrupt payload yields the caller's default. Writes
//! never fail either: storage errors are logged and the previous value
//! stays in place until the next successful write overwrites it.
//!
//! Every key is stored as `<namespace>:<key>` so the table can be shared
//! with other tools without collisions.
//!
//! Handles opened on the same file see each other's writes. Multi-key
//! read-modify-write sequences go through [`LocalStore::atomically`],
//! which holds the SQLite write lock for the whole closure.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::data_dir;
use crate::error::StoreError;

pub const DEFAULT_NAMESPACE: &str = "questline";
pub const DEFAULT_DATABASE: &str = "questline.db";

/// Synchronous key/value store shared by every component of one client.
///
/// Cloning is cheap and yields a handle to the same connection, which is
/// how several in-process client instances share one cache.
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
    namespace: String,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl LocalStore {
    /// Open the store at `~/.config/questline/questline.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory or the database cannot be opened.
    pub fn open_default(namespace: &str) -> Result<Self, crate::CoreError> {
        let path = data_dir()?.join(DEFAULT_DATABASE);
        Ok(Self::open(&path, namespace)?)
    }

    /// Open (or create) a store file at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or migrated.
    pub fn open(path: &Path, namespace: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        // Other client processes may hold the write lock briefly.
        conn.busy_timeout(Duration::from_secs(2))?;
        Self::from_connection(conn, namespace)
    }

    /// Open an in-memory store. Clones share the same memory.
    ///
    /// # Errors
    /// Returns an error if SQLite cannot allocate the database.
    pub fn open_memory(namespace: &str) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?, namespace)
    }

    fn from_connection(conn: Connection, namespace: &str) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            namespace: namespace.to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Read and deserialize `key`, returning `default` when the key is
    /// missing or its payload no longer parses.
    pub fn get<T: DeserializeOwned>(&self, key: impl AsRef<str>, default: T) -> T {
        let key = key.as_ref();
        match self.try_get::<T>(key) {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                tracing::warn!(key, error = %e, "local store read failed, using default");
                default
            }
        }
    }

    fn try_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.try_get_raw(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Serialization {
                key: key.to_string(),
                source,
            })
    }

    /// Persisted JSON text for `key`, if any.
    pub fn get_raw(&self, key: impl AsRef<str>) -> Option<String> {
        let key = key.as_ref();
        self.try_get_raw(key).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "local store raw read failed");
            None
        })
    }

    fn try_get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.lock()?;
        read_raw(&conn, &self.full_key(key))
    }

    /// Whether `key` has ever been written (and not removed since).
    pub fn contains(&self, key: impl AsRef<str>) -> bool {
        self.get_raw(key).is_some()
    }

    /// Serialize and persist `value` under `key`. Failures are logged.
    pub fn set<T: Serialize + ?Sized>(&self, key: impl AsRef<str>, value: &T) {
        let key = key.as_ref();
        if let Err(e) = self.try_set(key, value) {
            tracing::warn!(key, error = %e, "local store write failed");
        }
    }

    fn try_set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })?;
        self.set_raw(key, &json)
    }

    fn set_raw(&self, key: &str, json: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        write_raw(&conn, &self.full_key(key), json)
    }

    /// Run `f` inside one immediate SQLite transaction. Other handles on
    /// the same file wait until it commits; an error rolls everything back.
    ///
    /// # Errors
    /// Returns the closure's error, or the storage error that prevented
    /// the transaction from starting or committing.
    pub fn atomically<R>(
        &self,
        f: impl FnOnce(&StoreTxn<'_>) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = f(&StoreTxn {
            conn: &tx,
            namespace: &self.namespace,
        })?;
        tx.commit()?;
        Ok(result)
    }

    /// Read `key` (or `T::default()`), apply `f`, and write the result
    /// back in one transaction. Returns the value as written, or `None`
    /// when the store could not be updated (the failure is logged).
    pub fn update<T, F>(&self, key: impl AsRef<str>, f: F) -> Option<T>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T),
    {
        let key = key.as_ref();
        let result = self.atomically(|tx| {
            let mut value = tx.get(key, T::default());
            f(&mut value);
            tx.set(key, &value)?;
            Ok(value)
        });
        result
            .map_err(|e| tracing::warn!(key, error = %e, "local store update failed"))
            .ok()
    }

    /// Delete `key`. Removing a missing key is a no-op.
    pub fn remove(&self, key: impl AsRef<str>) {
        let key = key.as_ref();
        let result = self.lock().and_then(|conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", params![self.full_key(key)])
                .map_err(StoreError::from)
        });
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "local store remove failed");
        }
    }

    /// Keys in this namespace, without the namespace prefix.
    pub fn keys(&self) -> Vec<String> {
        let prefix = format!("{}:", self.namespace);
        let result = self.lock().and_then(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM kv WHERE key LIKE ?1 ORDER BY key")?;
            let rows = stmt.query_map(params![format!("{prefix}%")], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
        });
        match result {
            Ok(keys) => keys
                .into_iter()
                .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "local store key listing failed");
                Vec::new()
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn write_raw_for_test(&self, key: &str, json: &str) {
        self.set_raw(key, json).unwrap();
    }
}

/// View of the store inside [`LocalStore::atomically`].
pub struct StoreTxn<'a> {
    conn: &'a Connection,
    namespace: &'a str,
}

impl StoreTxn<'_> {
    fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Same contract as [`LocalStore::get`].
    pub fn get<T: DeserializeOwned>(&self, key: impl AsRef<str>, default: T) -> T {
        let key = key.as_ref();
        let parsed = read_raw(self.conn, &self.full_key(key)).and_then(|raw| match raw {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| StoreError::Serialization {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        });
        match parsed {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(e) => {
                tracing::warn!(key, error = %e, "local store read failed, using default");
                default
            }
        }
    }

    /// Serialize and stage `value` under `key`.
    ///
    /// # Errors
    /// Returns an error if the value cannot be serialized or written.
    pub fn set<T: Serialize + ?Sized>(&self, key: impl AsRef<str>, value: &T) -> Result<(), StoreError> {
        let key = key.as_ref();
        let json = serde_json::to_string(value).map_err(|source| StoreError::Serialization {
            key: key.to_string(),
            source,
        })?;
        write_raw(self.conn, &self.full_key(key), &json)
    }
}

fn read_raw(conn: &Connection, full_key: &str) -> Result<Option<String>, StoreError> {
    let raw = conn
        .query_row(
            "SELECT value FROM kv WHERE key = ?1",
            params![full_key],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(raw)
}

fn write_raw(conn: &Connection, full_key: &str, json: &str) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO kv (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![full_key, json],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
        score: u32,
    }

    fn store() -> LocalStore {
        LocalStore::open_memory("test").unwrap()
    }

    #[test]
    fn missing_key_returns_default() {
        let store = store();
        let items: Vec<Item> = store.get("materials", Vec::new());
        assert!(items.is_empty());
        assert!(!store.contains("materials"));
    }

    #[test]
    fn set_then_get() {
        let store = store();
        let items = vec![Item { id: "a".into(), score: 3 }];
        store.set("materials", &items);
        assert_eq!(store.get::<Vec<Item>>("materials", Vec::new()), items);
    }

    #[test]
    fn corrupt_payload_falls_back_to_default() {
        let store = store();
        store.write_raw_for_test("materials", "{not json");
        let items = store.get("materials", vec![Item { id: "seed".into(), score: 0 }]);
        assert_eq!(items[0].id, "seed");
    }

    #[test]
    fn corrupt_payload_is_overwritten_by_next_write() {
        let store = store();
        store.write_raw_for_test("materials", "{not json");
        store.set("materials", &vec![Item { id: "b".into(), score: 1 }]);
        assert_eq!(store.get::<Vec<Item>>("materials", Vec::new()).len(), 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let store = store();
        store.set("progress", &1u32);
        store.remove("progress");
        store.remove("progress");
        assert_eq!(store.get("progress", 0u32), 0);
    }

    #[test]
    fn namespaces_do_not_collide() {
        let a = store();
        let b = LocalStore {
            conn: a.conn.clone(),
            namespace: "other".into(),
        };
        a.set("progress", &1u32);
        b.set("progress", &2u32);
        assert_eq!(a.get("progress", 0u32), 1);
        assert_eq!(b.get("progress", 0u32), 2);
        assert_eq!(a.keys(), vec!["progress".to_string()]);
    }

    #[test]
    fn clones_share_state() {
        let a = store();
        let b = a.clone();
        a.set("events", &vec!["x"]);
        assert_eq!(b.get::<Vec<String>>("events", Vec::new()), vec!["x".to_string()]);
    }

    #[test]
    fn file_store_is_shared_between_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.db");
        let first = LocalStore::open(&path, "questline").unwrap();
        let second = LocalStore::open(&path, "questline").unwrap();
        first.set("streams", &vec![1, 2, 3]);
        assert_eq!(second.get::<Vec<u8>>("streams", Vec::new()), vec![1, 2, 3]);
    }

    #[test]
    fn update_reads_modifies_and_writes_back() {
        let store = store();
        let first: Option<Vec<u32>> = store.update("streams", |v: &mut Vec<u32>| v.push(1));
        assert_eq!(first, Some(vec![1]));
        store.update("streams", |v: &mut Vec<u32>| v.push(2));
        assert_eq!(store.get::<Vec<u32>>("streams", Vec::new()), vec![1, 2]);
    }

    #[test]
    fn update_starts_from_default_on_corrupt_payload() {
        let store = store();
        store.write_raw_for_test("streams", "{not json");
        let value = store.update("streams", |v: &mut Vec<u32>| v.push(7));
        assert_eq!(value, Some(vec![7]));
    }

    #[test]
    fn failed_transaction_writes_nothing() {
        let store = store();
        store.set("progress", &1u32);
        let result: Result<(), StoreError> = store.atomically(|tx| {
            tx.set("progress", &2u32)?;
            tx.set("events", &vec!["e"])?;
            Err(StoreError::Poisoned)
        });
        assert!(result.is_err());
        assert_eq!(store.get("progress", 0u32), 1);
        assert!(!store.contains("events"));
    }

    #[test]
    fn updates_from_two_file_handles_both_land() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.db");
        let first = LocalStore::open(&path, "questline").unwrap();
        let second = LocalStore::open(&path, "questline").unwrap();
        first.update("streams", |v: &mut Vec<u32>| v.push(1));
        second.update("streams", |v: &mut Vec<u32>| v.push(2));
        assert_eq!(first.get::<Vec<u32>>("streams", Vec::new()), vec![1, 2]);
    }
}
