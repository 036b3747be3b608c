//! Outgoing request payloads.

use bytes::Bytes;
use futures::TryStream;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::error::{BoxError, TransportError};

/// Request payload, tagged by how it goes on the wire.
///
/// The variant order mirrors the precedence used when the shape is inferred
/// through the `From` conversions: form fields, then raw text, raw bytes, a
/// byte stream, and finally anything else as JSON.
#[derive(Debug, Default)]
pub enum Body {
  /// No body at all.
  #[default]
  Empty,
  /// URL-encoded form fields.
  Form(Vec<(String, String)>),
  /// Sent verbatim as `text/plain`.
  Text(String),
  /// Opaque binary.
  Bytes(Bytes),
  /// Streamed body of unknown length.
  Stream(reqwest::Body),
  /// Encoded with the client's serializer as `application/json`.
  Json(Value),
}

impl Body {
  /// Serialize any value to a JSON body.
  pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, TransportError> {
    serde_json::to_value(value)
      .map(Body::Json)
      .map_err(|e| TransportError::Codec(e.into()))
  }

  /// Stream the body from a fallible byte stream.
  pub fn stream<S>(stream: S) -> Self
  where
    S: TryStream + Send + Sync + 'static,
    S::Error: Into<BoxError>,
    Bytes: From<S::Ok>,
  {
    Body::Stream(reqwest::Body::wrap_stream(stream))
  }

  pub fn is_empty(&self) -> bool {
    matches!(self, Body::Empty)
  }
}

impl From<HashMap<String, String>> for Body {
  fn from(fields: HashMap<String, String>) -> Self {
    Body::Form(fields.into_iter().collect())
  }
}

impl From<BTreeMap<String, String>> for Body {
  fn from(fields: BTreeMap<String, String>) -> Self {
    Body::Form(fields.into_iter().collect())
  }
}

impl From<Vec<(String, String)>> for Body {
  fn from(fields: Vec<(String, String)>) -> Self {
    Body::Form(fields)
  }
}

impl From<String> for Body {
  fn from(text: String) -> Self {
    Body::Text(text)
  }
}

impl From<&str> for Body {
  fn from(text: &str) -> Self {
    Body::Text(text.to_owned())
  }
}

impl From<Vec<u8>> for Body {
  fn from(bytes: Vec<u8>) -> Self {
    Body::Bytes(Bytes::from(bytes))
  }
}

impl From<Bytes> for Body {
  fn from(bytes: Bytes) -> Self {
    Body::Bytes(bytes)
  }
}

impl From<Value> for Body {
  fn from(value: Value) -> Self {
    Body::Json(value)
  }
}

impl<T: Into<Body>> From<Option<T>> for Body {
  fn from(payload: Option<T>) -> Self {
    payload.map(Into::into).unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[derive(Serialize)]
  struct NewPost<'a> {
    title: &'a str,
  }

  #[test]
  fn test_declared_shapes() {
    let mut form = HashMap::new();
    form.insert("a".to_string(), "1".to_string());

    assert!(matches!(Body::from(form), Body::Form(_)));
    assert!(matches!(Body::from("hi"), Body::Text(_)));
    assert!(matches!(Body::from(vec![1u8, 2, 3]), Body::Bytes(_)));
    assert!(matches!(Body::from(json!({"a": 1})), Body::Json(_)));
    assert!(Body::from(None::<String>).is_empty());
  }

  #[test]
  fn test_json_body_from_struct() {
    let body = Body::json(&NewPost { title: "hello" }).unwrap();
    match body {
      Body::Json(value) => assert_eq!(value, json!({"title": "hello"})),
      other => panic!("unexpected body {:?}", other),
    }
  }
}
