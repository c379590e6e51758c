//! Snapshot storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::traits::Cacheable;

/// A persisted entity list.
#[derive(Debug, Clone)]
pub struct CachedList<T> {
  /// The cached entities in fetch order
  pub entities: Vec<T>,
  /// When the list was fetched from the network
  pub cached_at: DateTime<Utc>,
}

/// Trait for snapshot storage backends.
pub trait CacheStorage: Send + Sync {
  /// Replace the stored list for `namespace` and the entity type of `T`.
  fn store_list<T: Cacheable>(
    &self,
    namespace: &str,
    entities: &[T],
    cached_at: DateTime<Utc>,
  ) -> Result<()>;

  /// Load the stored list, if any.
  fn load_list<T: Cacheable>(&self, namespace: &str) -> Result<Option<CachedList<T>>>;
}

/// Storage implementation that doesn't persist anything.
/// Used when persistence is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn store_list<T: Cacheable>(
    &self,
    _namespace: &str,
    _entities: &[T],
    _cached_at: DateTime<Utc>,
  ) -> Result<()> {
    Ok(()) // Discard
  }

  fn load_list<T: Cacheable>(&self, _namespace: &str) -> Result<Option<CachedList<T>>> {
    Ok(None) // Always miss
  }
}

/// Shared handle, so one database can back several stores.
impl<S: CacheStorage> CacheStorage for Arc<S> {
  fn store_list<T: Cacheable>(
    &self,
    namespace: &str,
    entities: &[T],
    cached_at: DateTime<Utc>,
  ) -> Result<()> {
    self.as_ref().store_list(namespace, entities, cached_at)
  }

  fn load_list<T: Cacheable>(&self, namespace: &str) -> Result<Option<CachedList<T>>> {
    self.as_ref().load_list(namespace)
  }
}

/// Storage chosen at startup: SQLite when persistence is on, nothing when off.
pub enum SnapshotStorage {
  Sqlite(SqliteStorage),
  Disabled(NoopStorage),
}

impl CacheStorage for SnapshotStorage {
  fn store_list<T: Cacheable>(
    &self,
    namespace: &str,
    entities: &[T],
    cached_at: DateTime<Utc>,
  ) -> Result<()> {
    match self {
      Self::Sqlite(storage) => storage.store_list(namespace, entities, cached_at),
      Self::Disabled(storage) => storage.store_list(namespace, entities, cached_at),
    }
  }

  fn load_list<T: Cacheable>(&self, namespace: &str) -> Result<Option<CachedList<T>>> {
    match self {
      Self::Sqlite(storage) => storage.load_list(namespace),
      Self::Disabled(storage) => storage.load_list(namespace),
    }
  }
}

/// SQLite-based snapshot storage.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open the snapshot database at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;
    Self::open_at(&path)
  }

  /// Open (or create) the snapshot database at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// In-memory database, gone when the storage is dropped.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;

    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("storefront").join("cache.db"))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
-- One serialized list per backend and entity type
CREATE TABLE IF NOT EXISTS list_cache (
    list_key TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    data BLOB NOT NULL,
    result_count INTEGER NOT NULL,
    cached_at TEXT NOT NULL,
    PRIMARY KEY (list_key, entity_type)
);
"#;

/// Stable fixed-length key for a namespace (usually the backend URL).
fn list_key(namespace: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(namespace.trim_end_matches('/').as_bytes());
  hex::encode(hasher.finalize())
}

impl CacheStorage for SqliteStorage {
  fn store_list<T: Cacheable>(
    &self,
    namespace: &str,
    entities: &[T],
    cached_at: DateTime<Utc>,
  ) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let data =
      serde_json::to_vec(entities).map_err(|e| eyre!("Failed to serialize entities: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO list_cache (list_key, entity_type, data, result_count, cached_at)
         VALUES (?, ?, ?, ?, ?)",
        params![
          list_key(namespace),
          T::entity_type(),
          data,
          entities.len(),
          cached_at.to_rfc3339()
        ],
      )
      .map_err(|e| eyre!("Failed to store {} list: {}", T::entity_type(), e))?;

    Ok(())
  }

  fn load_list<T: Cacheable>(&self, namespace: &str) -> Result<Option<CachedList<T>>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(Vec<u8>, String)> = conn
      .query_row(
        "SELECT data, cached_at FROM list_cache WHERE list_key = ? AND entity_type = ?",
        params![list_key(namespace), T::entity_type()],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to query {} list: {}", T::entity_type(), e))?;

    match row {
      Some((data, cached_at_str)) => {
        let entities: Vec<T> = serde_json::from_slice(&data)
          .map_err(|e| eyre!("Failed to deserialize {} list: {}", T::entity_type(), e))?;
        let cached_at = parse_datetime(&cached_at_str)?;
        Ok(Some(CachedList {
          entities,
          cached_at,
        }))
      }
      None => Ok(None),
    }
  }
}

/// Parse an RFC 3339 timestamp written by `store_list`.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::{Deserialize, Serialize};

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Widget {
    id: u32,
  }

  impl Cacheable for Widget {
    fn entity_type() -> &'static str {
      "widget"
    }
  }

  #[test]
  fn test_store_then_load() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let cached_at = Utc::now();

    storage
      .store_list("https://a.example.com", &[Widget { id: 1 }, Widget { id: 2 }], cached_at)
      .unwrap();

    let list = storage
      .load_list::<Widget>("https://a.example.com/")
      .unwrap()
      .unwrap();
    assert_eq!(list.entities, vec![Widget { id: 1 }, Widget { id: 2 }]);
    assert_eq!(list.cached_at.timestamp_micros(), cached_at.timestamp_micros());
  }

  #[test]
  fn test_namespaces_do_not_mix() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage
      .store_list("https://a.example.com", &[Widget { id: 1 }], Utc::now())
      .unwrap();

    assert!(storage
      .load_list::<Widget>("https://b.example.com")
      .unwrap()
      .is_none());
  }

  #[test]
  fn test_store_replaces_previous_list() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage
      .store_list("ns", &[Widget { id: 1 }, Widget { id: 2 }], Utc::now())
      .unwrap();
    storage.store_list("ns", &[Widget { id: 3 }], Utc::now()).unwrap();

    let list = storage.load_list::<Widget>("ns").unwrap().unwrap();
    assert_eq!(list.entities, vec![Widget { id: 3 }]);
  }

  #[test]
  fn test_noop_storage_always_misses() {
    NoopStorage
      .store_list("ns", &[Widget { id: 1 }], Utc::now())
      .unwrap();
    assert!(NoopStorage.load_list::<Widget>("ns").unwrap().is_none());
  }
}
