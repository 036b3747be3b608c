//! The narrow interface the fetch engine uses against local persistence.

use async_trait::async_trait;
use color_eyre::Result;

use crate::record::Record;
use crate::specification::Specification;

/// Read and write-through operations against the local cache.
///
/// Failures are returned as-is; the fetch engine is responsible for wrapping them.
#[async_trait]
pub trait CachePort: Send + Sync {
  /// All cached records of type `R` matching the specification's local query.
  async fn fetch_by_specification<R, S>(&self, spec: &S) -> Result<Vec<R>>
  where
    R: Record,
    S: Specification + ?Sized;

  /// Insert every record, replacing any stored record with the same key.
  async fn insert_or_replace_all<R: Record>(&self, records: &[R]) -> Result<()>;
}

/// Cache that stores nothing.
/// Used when caching is disabled - reads always come back empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl CachePort for NoopCache {
  async fn fetch_by_specification<R, S>(&self, _spec: &S) -> Result<Vec<R>>
  where
    R: Record,
    S: Specification + ?Sized,
  {
    Ok(Vec::new()) // Always miss
  }

  async fn insert_or_replace_all<R: Record>(&self, _records: &[R]) -> Result<()> {
    Ok(()) // Discard
  }
}
