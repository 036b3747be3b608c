//! SQLite-backed cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use super::port::CachePort;
use crate::record::Record;
use crate::specification::Specification;

/// A single cached record.
#[derive(Debug, Clone)]
pub struct CachedRecord<T> {
  /// The cached record
  pub record: T,
  /// When the record was last written
  pub cached_at: DateTime<Utc>,
}

/// SQLite-based cache storage.
///
/// Every record is stored as a JSON document in the `data` column of one
/// `records` table, keyed by entity type and record key. Specifications query
/// that column, typically through `json_extract`.
pub struct SqliteCache {
  conn: Mutex<Connection>,
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    entity_type TEXT NOT NULL,
    record_key TEXT NOT NULL,
    data TEXT NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (entity_type, record_key)
);

CREATE INDEX IF NOT EXISTS idx_records_type ON records(entity_type);
"#;

impl SqliteCache {
  /// Open the cache at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open (or create) the cache database at `path`.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// A private cache that lives as long as this value.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("restcache").join("cache.db"))
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
    self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  /// Get a single record by key.
  pub fn get<R: Record>(&self, record_key: &str) -> Result<Option<CachedRecord<R>>> {
    let conn = self.lock()?;

    let row: Option<(String, String)> = conn
      .query_row(
        "SELECT data, cached_at FROM records WHERE entity_type = ? AND record_key = ?",
        params![R::entity_type(), record_key],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to query record: {}", e))?;

    match row {
      Some((data, cached_at)) => Ok(Some(CachedRecord {
        record: decode(&data)?,
        cached_at: parse_datetime(&cached_at)?,
      })),
      None => Ok(None),
    }
  }

  /// Delete a single record. Returns whether it existed.
  pub fn remove<R: Record>(&self, record_key: &str) -> Result<bool> {
    let conn = self.lock()?;
    let deleted = conn
      .execute(
        "DELETE FROM records WHERE entity_type = ? AND record_key = ?",
        params![R::entity_type(), record_key],
      )
      .map_err(|e| eyre!("Failed to delete record: {}", e))?;
    Ok(deleted > 0)
  }

  /// Delete every record of type `R`. Returns how many were removed.
  pub fn purge<R: Record>(&self) -> Result<usize> {
    let conn = self.lock()?;
    let deleted = conn
      .execute(
        "DELETE FROM records WHERE entity_type = ?",
        params![R::entity_type()],
      )
      .map_err(|e| eyre!("Failed to purge records: {}", e))?;
    debug!(entity_type = R::entity_type(), deleted, "purged cache");
    Ok(deleted)
  }

  fn query<R, S>(&self, spec: &S) -> Result<Vec<R>>
  where
    R: Record,
    S: Specification + ?Sized,
  {
    let conn = self.lock()?;
    let filter = spec.local_query();
    let mut bindings: Vec<SqlValue> = spec.local_parameters().into_iter().map(sql_value).collect();

    // Specification placeholders come first, so the entity type is bound last.
    let sql = if filter.trim().is_empty() {
      "SELECT data FROM records WHERE entity_type = ?1 ORDER BY rowid".to_string()
    } else {
      format!(
        "SELECT data FROM records WHERE ({}) AND entity_type = ?{} ORDER BY rowid",
        filter,
        bindings.len() + 1
      )
    };
    bindings.push(SqlValue::Text(R::entity_type().to_string()));

    let mut stmt = conn
      .prepare(&sql)
      .map_err(|e| eyre!("Failed to prepare cache query {:?}: {}", filter, e))?;

    let rows: Vec<String> = stmt
      .query_map(params_from_iter(bindings.iter()), |row| row.get(0))
      .map_err(|e| eyre!("Failed to query records: {}", e))?
      .collect::<rusqlite::Result<_>>()
      .map_err(|e| eyre!("Failed to read records: {}", e))?;

    rows.iter().map(|data| decode(data)).collect()
  }

  fn store_all<R: Record>(&self, records: &[R]) -> Result<()> {
    let mut conn = self.lock()?;
    let entity_type = R::entity_type();

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    for record in records {
      let data =
        serde_json::to_string(record).map_err(|e| eyre!("Failed to serialize record: {}", e))?;

      tx.execute(
        "INSERT OR REPLACE INTO records (entity_type, record_key, data, cached_at)
         VALUES (?, ?, ?, datetime('now'))",
        params![entity_type, record.record_key(), data],
      )
      .map_err(|e| eyre!("Failed to store record: {}", e))?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    debug!(entity_type, count = records.len(), "stored records");
    Ok(())
  }
}

#[async_trait]
impl CachePort for SqliteCache {
  async fn fetch_by_specification<R, S>(&self, spec: &S) -> Result<Vec<R>>
  where
    R: Record,
    S: Specification + ?Sized,
  {
    self.query(spec)
  }

  async fn insert_or_replace_all<R: Record>(&self, records: &[R]) -> Result<()> {
    self.store_all(records)
  }
}

/// Convert a specification parameter to the value SQLite compares against.
///
/// Strings bind as plain text (not their JSON encoding) so they match what
/// `json_extract` returns. Arrays and objects bind as JSON text.
fn sql_value(value: Value) -> SqlValue {
  match value {
    Value::Null => SqlValue::Null,
    Value::Bool(b) => SqlValue::Integer(b as i64),
    Value::Number(n) => match n.as_i64() {
      Some(i) => SqlValue::Integer(i),
      None => n
        .as_f64()
        .map(SqlValue::Real)
        .unwrap_or_else(|| SqlValue::Text(n.to_string())),
    },
    Value::String(s) => SqlValue::Text(s),
    other => SqlValue::Text(other.to_string()),
  }
}

fn decode<R: Record>(data: &str) -> Result<R> {
  serde_json::from_str(data).map_err(|e| eyre!("Failed to deserialize record: {}", e))
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
