//! Query descriptors that render to both a remote path and a local cache query.

use serde_json::Value;

/// A filter over one conceptual record set, renderable for the API and for the cache.
///
/// The remote path and the local query must describe the same filter. Nothing
/// checks this; it is up to the implementor.
///
/// The local query is a SQL boolean expression evaluated against each cached
/// record, whose JSON document is exposed as the `data` column. Parameters bind
/// in order to its `?` placeholders. An empty query selects every cached record
/// of the requested type.
pub trait Specification: Send + Sync {
  /// Resource path for the API, either root-relative (`/posts?userId=1`) or absolute.
  fn api_path(&self) -> String;

  /// Predicate over the cached `data` column, e.g. `json_extract(data, '$.userId') = ?`.
  fn local_query(&self) -> String;

  /// Values bound to the placeholders of [`Specification::local_query`].
  fn local_parameters(&self) -> Vec<Value>;
}

/// A plain specification assembled from its three views.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
  api_path: String,
  local_query: String,
  parameters: Vec<Value>,
}

impl QuerySpec {
  /// A specification that selects every record at `api_path`.
  pub fn new(api_path: impl Into<String>) -> Self {
    Self {
      api_path: api_path.into(),
      ..Self::default()
    }
  }

  /// Set the local predicate and its parameters.
  pub fn filter(mut self, local_query: impl Into<String>, parameters: Vec<Value>) -> Self {
    self.local_query = local_query.into();
    self.parameters = parameters;
    self
  }
}

impl Specification for QuerySpec {
  fn api_path(&self) -> String {
    self.api_path.clone()
  }

  fn local_query(&self) -> String {
    self.local_query.clone()
  }

  fn local_parameters(&self) -> Vec<Value> {
    self.parameters.clone()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_new_selects_everything_locally() {
    let spec = QuerySpec::new("/posts");
    assert_eq!(spec.api_path(), "/posts");
    assert!(spec.local_query().is_empty());
    assert!(spec.local_parameters().is_empty());
  }

  #[test]
  fn test_filter_keeps_parameter_order() {
    let spec = QuerySpec::new("/posts?userId=1&id=2").filter(
      "json_extract(data, '$.userId') = ? AND json_extract(data, '$.id') = ?",
      vec![json!(1), json!(2)],
    );
    assert_eq!(spec.local_parameters(), vec![json!(1), json!(2)]);
  }
}
