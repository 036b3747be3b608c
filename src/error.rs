//! Error kinds surfaced by the transport and the fetch engine.

use thiserror::Error;

/// Boxed error used to carry an arbitrary underlying cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Raised before any I/O when the client configuration or a request path is malformed.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("base url cannot end with a trailing '/' character: {0}")]
  TrailingSlash(String),

  #[error("path must begin with a '/' character: {0}")]
  RelativePath(String),

  #[error("no default base url configured for relative path {0}")]
  MissingBaseUrl(String),

  #[error("invalid url {url}: {source}")]
  InvalidUrl {
    url: String,
    #[source]
    source: url::ParseError,
  },

  #[error("invalid header name {0:?}")]
  InvalidHeaderName(String),

  #[error("invalid value for header {0:?}")]
  InvalidHeaderValue(String),

  #[error("failed to build http client: {0}")]
  Client(#[source] reqwest::Error),
}

/// Failure of a single transport call. Non-success status codes are not errors.
#[derive(Debug, Error)]
pub enum TransportError {
  #[error(transparent)]
  Config(#[from] ConfigError),

  #[error("http request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("failed to encode or decode payload: {0}")]
  Codec(#[source] BoxError),

  #[error("response payload cannot be read as {0}")]
  ShapeMismatch(&'static str),
}

/// The single error kind returned by [`crate::Fetcher`].
///
/// Whatever collaborator failed (reachability, transport or cache), the
/// original failure is available through [`std::error::Error::source`].
#[derive(Debug, Error)]
#[error("An exception occurred while attempting to fetch data.")]
pub struct FetchError {
  #[source]
  cause: BoxError,
}

impl FetchError {
  pub fn new(cause: impl Into<BoxError>) -> Self {
    Self {
      cause: cause.into(),
    }
  }

  /// The underlying failure.
  pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
    self.cause.as_ref()
  }

  /// Downcast the underlying failure to a concrete type.
  pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
    self.cause.downcast_ref::<E>()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::error::Error as _;

  #[test]
  fn test_fetch_error_keeps_cause() {
    let err = FetchError::new(TransportError::ShapeMismatch("stream"));

    assert_eq!(
      err.to_string(),
      "An exception occurred while attempting to fetch data."
    );
    assert!(err.downcast_ref::<TransportError>().is_some());
    assert!(err.source().is_some());
  }

  #[test]
  fn test_config_error_converts_into_transport_error() {
    let err: TransportError = ConfigError::RelativePath("posts".into()).into();
    assert!(matches!(
      err,
      TransportError::Config(ConfigError::RelativePath(_))
    ));
  }
}
