//! Local persistence for fetched records.
//!
//! The fetch engine only sees the [`CachePort`] interface: fetch by
//! specification and bulk insert-or-replace. [`SqliteCache`] is the on-disk
//! implementation and additionally supports the usual cache-manager operations
//! (single get, remove, purge).

mod port;
mod storage;

pub use port::{CachePort, NoopCache};
pub use storage::{CachedRecord, SqliteCache};
