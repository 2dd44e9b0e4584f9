//! Persistence of an allow-listed subset of store state.
//!
//! A store never hands its whole state to an adapter: [`select_persisted`]
//! projects the serialized state onto the configured `persist_keys` and
//! always strips the reserved compliance key. Adapters only move that
//! projection to and from durable storage.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{params, Connection};
use serde_json::{Map, Value};
use tracing::debug;

use custodia_types::{CustodiaError, COMPLIANCE_STATE_KEY};

/// Storage backend for the persisted subset of a store's state.
pub trait PersistenceAdapter: Send {
    /// Load the last saved snapshot, or `None` if nothing was saved yet.
    fn load(&mut self) -> Result<Option<Map<String, Value>>, CustodiaError>;

    /// Replace the saved snapshot.
    fn save(&mut self, snapshot: &Map<String, Value>) -> Result<(), CustodiaError>;
}

/// Project `state` onto `keys`.
///
/// Keys missing from the state are skipped. The reserved compliance key is
/// never included, even if listed. Non-object state yields an empty map.
pub fn select_persisted(state: &Value, keys: &[String]) -> Map<String, Value> {
    let Value::Object(obj) = state else {
        return Map::new();
    };
    keys.iter()
        .filter(|k| k.as_str() != COMPLIANCE_STATE_KEY)
        .filter_map(|k| obj.get(k).map(|v| (k.clone(), v.clone())))
        .collect()
}

/// In-process adapter. Clones share the same slot, so a test can keep a
/// handle and inspect what a store saved.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    slot: Arc<Mutex<Option<Map<String, Value>>>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// An adapter pre-seeded with `snapshot`.
    pub fn with_snapshot(snapshot: Map<String, Value>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(snapshot))),
        }
    }

    /// The currently saved snapshot.
    pub fn snapshot(&self) -> Option<Map<String, Value>> {
        match self.slot.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl PersistenceAdapter for MemoryAdapter {
    fn load(&mut self) -> Result<Option<Map<String, Value>>, CustodiaError> {
        Ok(self.snapshot())
    }

    fn save(&mut self, snapshot: &Map<String, Value>) -> Result<(), CustodiaError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| CustodiaError::PersistenceError("memory slot poisoned".into()))?;
        *slot = Some(snapshot.clone());
        Ok(())
    }
}

/// Stores the snapshot as a single JSON object in a file.
///
/// Saves write a sibling temp file and rename it over the target, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonFileAdapter {
    path: PathBuf,
}

impl JsonFileAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PersistenceAdapter for JsonFileAdapter {
    fn load(&mut self) -> Result<Option<Map<String, Value>>, CustodiaError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path).map_err(|e| {
            CustodiaError::PersistenceError(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))
        })?;
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) => Err(CustodiaError::PersistenceError(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(CustodiaError::PersistenceError(format!(
                "failed to parse {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn save(&mut self, snapshot: &Map<String, Value>) -> Result<(), CustodiaError> {
        let content = serde_json::to_string_pretty(snapshot)
            .map_err(|e| CustodiaError::SerializationError(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, content).map_err(|e| {
            CustodiaError::PersistenceError(format!("failed to write {}: {e}", tmp.display()))
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            CustodiaError::PersistenceError(format!(
                "failed to replace {}: {e}",
                self.path.display()
            ))
        })?;
        debug!(path = %self.path.display(), keys = snapshot.len(), "state snapshot saved");
        Ok(())
    }
}

/// SQLite-backed adapter: one row per persisted key, namespaced per store
/// so several stores can share a database file.
pub struct SqliteAdapter {
    conn: Connection,
    namespace: String,
}

impl SqliteAdapter {
    /// Open (or create) the database at `path`.
    ///
    /// Enables WAL mode and creates the `persisted_state` table if needed.
    pub fn open(path: &Path, namespace: impl Into<String>) -> Result<Self, CustodiaError> {
        let conn = Connection::open(path).map_err(|e| {
            CustodiaError::PersistenceError(format!("failed to open database: {e}"))
        })?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| CustodiaError::PersistenceError(format!("failed to set WAL mode: {e}")))?;
        Self::init(conn, namespace.into())
    }

    /// A private in-memory database.
    pub fn open_in_memory(namespace: impl Into<String>) -> Result<Self, CustodiaError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            CustodiaError::PersistenceError(format!("failed to open in-memory database: {e}"))
        })?;
        Self::init(conn, namespace.into())
    }

    fn init(conn: Connection, namespace: String) -> Result<Self, CustodiaError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS persisted_state (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (namespace, key)
            );",
        )
        .map_err(|e| CustodiaError::PersistenceError(format!("failed to create schema: {e}")))?;
        Ok(Self { conn, namespace })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl PersistenceAdapter for SqliteAdapter {
    fn load(&mut self) -> Result<Option<Map<String, Value>>, CustodiaError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM persisted_state WHERE namespace = ?1 ORDER BY key")
            .map_err(|e| CustodiaError::PersistenceError(format!("load prepare failed: {e}")))?;

        let rows = stmt
            .query_map(params![self.namespace], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| CustodiaError::PersistenceError(format!("load failed: {e}")))?;

        let mut map = Map::new();
        for row in rows {
            let (key, raw) =
                row.map_err(|e| CustodiaError::PersistenceError(format!("load read failed: {e}")))?;
            let value = serde_json::from_str(&raw).map_err(|e| {
                CustodiaError::PersistenceError(format!("bad stored value for '{key}': {e}"))
            })?;
            map.insert(key, value);
        }

        Ok(if map.is_empty() { None } else { Some(map) })
    }

    fn save(&mut self, snapshot: &Map<String, Value>) -> Result<(), CustodiaError> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| CustodiaError::PersistenceError(format!("begin failed: {e}")))?;

        tx.execute(
            "DELETE FROM persisted_state WHERE namespace = ?1",
            params![self.namespace],
        )
        .map_err(|e| CustodiaError::PersistenceError(format!("clear failed: {e}")))?;

        let now = Utc::now().to_rfc3339();
        for (key, value) in snapshot {
            tx.execute(
                "INSERT INTO persisted_state (namespace, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)",
                params![self.namespace, key, value.to_string(), now],
            )
            .map_err(|e| CustodiaError::PersistenceError(format!("insert '{key}' failed: {e}")))?;
        }

        tx.commit()
            .map_err(|e| CustodiaError::PersistenceError(format!("commit failed: {e}")))
    }
}
