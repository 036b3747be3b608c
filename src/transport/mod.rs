//! Typed HTTP transport.
//!
//! Requests go to an absolute url or a root-relative path resolved against a
//! configured base url. Outgoing payloads are described by [`Body`]; the
//! requested result type (see [`FromResponse`]) decides how the response body
//! is read:
//! - [`ResponseStream`]: live body, returned whatever the status
//! - any other type on a non-2xx status: no payload, body untouched
//! - `Bytes` / `Vec<u8>`: raw bytes
//! - `String`: raw text
//! - [`Json<T>`], `serde_json::Value`, `serde_json::Map`: decoded by the serializer
//!
//! Network failures come back as [`TransportError`]; a non-2xx status is
//! reported in the [`Envelope`], not as an error.

mod body;
mod client;
mod codec;
mod response;


use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::TransportError;

pub use body::Body;
pub use client::{ClientOptions, CredentialFn, RestClient, RestClientBuilder};
pub use codec::{decode, decode_map, JsonSerializer, Serializer};
pub use response::{Envelope, FromResponse, Json, RawPayload, ResponseStream, Shape};

/// Verbs available to callers of the transport.
#[async_trait]
pub trait Transport: Send + Sync {
  /// GET without reading the body.
  async fn get(&self, path: &str) -> Result<Envelope, TransportError> {
    self.get_as::<()>(path).await
  }

  async fn get_as<T: FromResponse>(&self, path: &str) -> Result<Envelope<T>, TransportError>;

  /// GET and decode the body as JSON into `T`.
  async fn get_json<T>(&self, path: &str) -> Result<Envelope<T>, TransportError>
  where
    T: DeserializeOwned + Send + 'static,
  {
    Ok(self.get_as::<Json<T>>(path).await?.map(Json::into_inner))
  }

  async fn post<T: FromResponse>(&self, path: &str, body: Body) -> Result<Envelope<T>, TransportError>;

  async fn put<T: FromResponse>(&self, path: &str, body: Body) -> Result<Envelope<T>, TransportError>;

  async fn delete(&self, path: &str) -> Result<Envelope, TransportError>;
}
