//! The capability every fetched record type must have.

use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};

/// A domain record that can be decoded from the API and stored in the cache.
///
/// Only `entity_type` and `record_key` are consulted, and only by the cache;
/// the fetch engine treats records as opaque values.
pub trait Record: Default + Serialize + DeserializeOwned + Send + Sync + 'static {
  /// Name used to group records of this type in storage (e.g. "post").
  /// Persisted, so it must stay stable across releases.
  fn entity_type() -> &'static str;

  /// Identity used by insert-or-replace, usually the record's primary key.
  fn record_key(&self) -> String;
}

/// SHA-256 hex digest of a value's JSON encoding.
///
/// For records with no natural key; such records are deduplicated by value.
pub fn content_key<T: Serialize + ?Sized>(value: &T) -> String {
  let encoded = serde_json::to_vec(value).unwrap_or_default();
  let mut hasher = Sha256::new();
  hasher.update(&encoded);
  hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::Deserialize;

  #[derive(Debug, Default, Serialize, Deserialize)]
  struct Tag {
    label: String,
  }

  #[test]
  fn test_content_key_is_stable_hash() {
    let a = Tag {
      label: "rust".into(),
    };
    let b = Tag {
      label: "rust".into(),
    };
    let c = Tag { label: "go".into() };

    assert_eq!(content_key(&a), content_key(&b));
    assert_ne!(content_key(&a), content_key(&c));
    assert_eq!(content_key(&a).len(), 64);
  }
}
