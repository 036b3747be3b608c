//! Pluggable serialization strategy for JSON payloads.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::BoxError;

/// Converts between structured values and their wire text.
///
/// Everything structured goes through [`Serializer::parse`] first, so a
/// replacement strategy (different number handling, key casing...) applies
/// equally to typed and loosely-typed decode targets.
pub trait Serializer: Send + Sync {
  fn serialize(&self, value: &Value) -> Result<String, BoxError>;

  fn parse(&self, text: &str) -> Result<Value, BoxError>;
}

/// Default codec backed by serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
  fn serialize(&self, value: &Value) -> Result<String, BoxError> {
    Ok(serde_json::to_string(value)?)
  }

  fn parse(&self, text: &str) -> Result<Value, BoxError> {
    Ok(serde_json::from_str(text)?)
  }
}

/// Decode `text` into a statically declared structure.
pub fn decode<T: DeserializeOwned>(serializer: &dyn Serializer, text: &str) -> Result<T, BoxError> {
  let value = serializer.parse(text)?;
  Ok(serde_json::from_value(value)?)
}

/// Decode `text` into a generic key-value mapping.
pub fn decode_map(serializer: &dyn Serializer, text: &str) -> Result<Map<String, Value>, BoxError> {
  match serializer.parse(text)? {
    Value::Object(map) => Ok(map),
    other => Err(format!("expected a JSON object, found {}", kind(&other)).into()),
  }
}

fn kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::Deserialize;

  #[derive(Debug, Deserialize, PartialEq)]
  struct Post {
    id: u32,
    title: String,
  }

  #[test]
  fn test_decode_struct_and_map_from_same_text() {
    let text = r#"{"id": 1, "title": "hello"}"#;

    let post: Post = decode(&JsonSerializer, text).unwrap();
    assert_eq!(
      post,
      Post {
        id: 1,
        title: "hello".into()
      }
    );

    let map = decode_map(&JsonSerializer, text).unwrap();
    assert_eq!(map["title"], "hello");
  }

  #[test]
  fn test_decode_map_rejects_arrays() {
    let err = decode_map(&JsonSerializer, "[1, 2]").unwrap_err();
    assert!(err.to_string().contains("an array"));
  }

  #[test]
  fn test_invalid_json_is_an_error() {
    assert!(decode::<Post>(&JsonSerializer, "{not json").is_err());
  }
}
