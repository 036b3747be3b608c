//! Response envelope and result-shape negotiation.

use bytes::{Bytes, BytesMut};
use futures::stream::{BoxStream, Stream, StreamExt};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::codec::{self, Serializer};
use crate::error::TransportError;

/// Normalized result of one transport call.
#[derive(Debug)]
pub struct Envelope<T = ()> {
  status: StatusCode,
  data: Option<T>,
}

impl<T> Envelope<T> {
  pub fn new(status: StatusCode, data: Option<T>) -> Self {
    Self { status, data }
  }

  /// Envelope for a non-success response whose body was not read.
  pub fn unsuccessful(status: StatusCode) -> Self {
    Self { status, data: None }
  }

  pub fn status(&self) -> StatusCode {
    self.status
  }

  pub fn status_code(&self) -> u16 {
    self.status.as_u16()
  }

  /// True for any 2xx status.
  pub fn is_success(&self) -> bool {
    self.status.is_success()
  }

  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  pub fn into_data(self) -> Option<T> {
    self.data
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
    Envelope {
      status: self.status,
      data: self.data.map(f),
    }
  }
}

/// How a response body must be read for a requested result type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
  /// Hand the live body to the caller, whatever the status.
  Stream,
  /// Whole body as bytes.
  Bytes,
  /// Whole body as text.
  Text,
  /// Body text decoded through the serializer.
  Json,
  /// Body is not read.
  Discard,
}

/// A response body after it has been read according to a [`Shape`].
pub enum RawPayload {
  Stream(ResponseStream),
  Bytes(Bytes),
  Text(String),
  Empty,
}

impl RawPayload {
  fn describe(&self) -> &'static str {
    match self {
      RawPayload::Stream(_) => "stream",
      RawPayload::Bytes(_) => "bytes",
      RawPayload::Text(_) => "text",
      RawPayload::Empty => "empty",
    }
  }
}

/// A type a response body can be turned into.
pub trait FromResponse: Sized + Send + 'static {
  const SHAPE: Shape;

  fn from_payload(payload: RawPayload, serializer: &dyn Serializer) -> Result<Self, TransportError>;
}

fn mismatch(expected: &'static str, payload: &RawPayload) -> TransportError {
  tracing::debug!("expected {} payload, got {}", expected, payload.describe());
  TransportError::ShapeMismatch(expected)
}

impl FromResponse for () {
  const SHAPE: Shape = Shape::Discard;

  fn from_payload(_payload: RawPayload, _serializer: &dyn Serializer) -> Result<Self, TransportError> {
    Ok(())
  }
}

impl FromResponse for Bytes {
  const SHAPE: Shape = Shape::Bytes;

  fn from_payload(payload: RawPayload, _serializer: &dyn Serializer) -> Result<Self, TransportError> {
    match payload {
      RawPayload::Bytes(bytes) => Ok(bytes),
      RawPayload::Text(text) => Ok(Bytes::from(text)),
      other => Err(mismatch("bytes", &other)),
    }
  }
}

impl FromResponse for Vec<u8> {
  const SHAPE: Shape = Shape::Bytes;

  fn from_payload(payload: RawPayload, serializer: &dyn Serializer) -> Result<Self, TransportError> {
    Bytes::from_payload(payload, serializer).map(|bytes| bytes.to_vec())
  }
}

impl FromResponse for String {
  const SHAPE: Shape = Shape::Text;

  fn from_payload(payload: RawPayload, _serializer: &dyn Serializer) -> Result<Self, TransportError> {
    match payload {
      RawPayload::Text(text) => Ok(text),
      RawPayload::Bytes(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
      other => Err(mismatch("text", &other)),
    }
  }
}

impl FromResponse for ResponseStream {
  const SHAPE: Shape = Shape::Stream;

  fn from_payload(payload: RawPayload, _serializer: &dyn Serializer) -> Result<Self, TransportError> {
    match payload {
      RawPayload::Stream(stream) => Ok(stream),
      RawPayload::Bytes(bytes) => Ok(ResponseStream::from_bytes(bytes)),
      RawPayload::Text(text) => Ok(ResponseStream::from_bytes(Bytes::from(text))),
      other => Err(mismatch("stream", &other)),
    }
  }
}

fn json_text(payload: RawPayload) -> Result<String, TransportError> {
  match payload {
    RawPayload::Text(text) => Ok(text),
    RawPayload::Bytes(bytes) => String::from_utf8(bytes.to_vec()).map_err(|e| TransportError::Codec(e.into())),
    other => Err(mismatch("json", &other)),
  }
}

/// Statically typed JSON decode target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
  pub fn into_inner(self) -> T {
    self.0
  }
}

impl<T: DeserializeOwned + Send + 'static> FromResponse for Json<T> {
  const SHAPE: Shape = Shape::Json;

  fn from_payload(payload: RawPayload, serializer: &dyn Serializer) -> Result<Self, TransportError> {
    let text = json_text(payload)?;
    codec::decode(serializer, &text)
      .map(Json)
      .map_err(TransportError::Codec)
  }
}

impl FromResponse for Value {
  const SHAPE: Shape = Shape::Json;

  fn from_payload(payload: RawPayload, serializer: &dyn Serializer) -> Result<Self, TransportError> {
    let text = json_text(payload)?;
    serializer.parse(&text).map_err(TransportError::Codec)
  }
}

impl FromResponse for Map<String, Value> {
  const SHAPE: Shape = Shape::Json;

  fn from_payload(payload: RawPayload, serializer: &dyn Serializer) -> Result<Self, TransportError> {
    let text = json_text(payload)?;
    codec::decode_map(serializer, &text).map_err(TransportError::Codec)
  }
}

/// Live response body.
///
/// Owns the underlying response: dropping the stream, read or not, releases
/// the connection.
pub struct ResponseStream {
  inner: BoxStream<'static, Result<Bytes, TransportError>>,
}

impl ResponseStream {
  pub(crate) fn from_response(response: reqwest::Response) -> Self {
    Self {
      inner: response
        .bytes_stream()
        .map(|chunk| chunk.map_err(TransportError::from))
        .boxed(),
    }
  }

  /// A stream over an in-memory buffer.
  pub fn from_bytes(bytes: Bytes) -> Self {
    Self {
      inner: futures::stream::once(async move { Ok(bytes) }).boxed(),
    }
  }

  /// Drain the stream into one buffer.
  pub async fn read_to_end(mut self) -> Result<Bytes, TransportError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = self.inner.next().await {
      buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
  }

  /// Drain the stream and decode it as UTF-8.
  pub async fn read_to_string(self) -> Result<String, TransportError> {
    let bytes = self.read_to_end().await?;
    String::from_utf8(bytes.to_vec()).map_err(|e| TransportError::Codec(e.into()))
  }
}

impl Stream for ResponseStream {
  type Item = Result<Bytes, TransportError>;

  fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    self.inner.as_mut().poll_next(cx)
  }
}

impl fmt::Debug for ResponseStream {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ResponseStream").finish_non_exhaustive()
  }
}
