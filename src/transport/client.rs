//! reqwest-backed implementation of [`Transport`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

use super::body::Body;
use super::codec::{JsonSerializer, Serializer};
use super::response::{Envelope, FromResponse, RawPayload, ResponseStream, Shape};
use super::Transport;
use crate::config::ApiConfig;
use crate::error::{ConfigError, TransportError};

/// Produces the credential part of the `Authorization` header.
pub type CredentialFn = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Clone)]
struct Authorization {
  scheme: String,
  credential: CredentialFn,
}

/// Immutable configuration of a [`RestClient`].
#[derive(Clone)]
pub struct ClientOptions {
  /// Validated base url, always stored with a single trailing '/'.
  base_url: Option<String>,
  user_agent: Option<String>,
  authorization: Option<Authorization>,
  headers: Vec<(String, Vec<String>)>,
  serializer: Arc<dyn Serializer>,
  timeout: Option<Duration>,
}

impl Default for ClientOptions {
  fn default() -> Self {
    Self {
      base_url: None,
      user_agent: None,
      authorization: None,
      headers: Vec::new(),
      serializer: Arc::new(JsonSerializer),
      timeout: None,
    }
  }
}

impl fmt::Debug for ClientOptions {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ClientOptions")
      .field("base_url", &self.base_url)
      .field("user_agent", &self.user_agent)
      .field(
        "authorization",
        &self.authorization.as_ref().map(|a| a.scheme.as_str()),
      )
      .field("headers", &self.headers)
      .field("timeout", &self.timeout)
      .finish_non_exhaustive()
  }
}

/// Populates [`ClientOptions`] before the client is constructed.
#[derive(Debug, Default)]
pub struct RestClientBuilder {
  options: ClientOptions,
}

impl RestClientBuilder {
  /// Root against which relative paths are resolved.
  ///
  /// Must be an absolute url without a trailing '/'.
  pub fn default_base_url(mut self, base_url: &str) -> Result<Self, ConfigError> {
    if base_url.ends_with('/') {
      return Err(ConfigError::TrailingSlash(base_url.to_string()));
    }
    let parsed = Url::parse(base_url).map_err(|source| ConfigError::InvalidUrl {
      url: base_url.to_string(),
      source,
    })?;
    if parsed.cannot_be_a_base() {
      return Err(ConfigError::InvalidUrl {
        url: base_url.to_string(),
        source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
      });
    }
    self.options.base_url = Some(format!("{}/", base_url));
    Ok(self)
  }

  /// Sets `User-Agent` to `name` or `name/version`.
  pub fn user_agent(mut self, name: &str, version: Option<&str>) -> Self {
    self.options.user_agent = Some(match version {
      Some(version) => format!("{}/{}", name, version),
      None => name.to_string(),
    });
    self
  }

  /// Sets `Authorization: <scheme> <credential>`, calling `credential` on every request.
  pub fn authorization<F>(mut self, scheme: &str, credential: F) -> Self
  where
    F: Fn() -> String + Send + Sync + 'static,
  {
    self.options.authorization = Some(Authorization {
      scheme: scheme.to_string(),
      credential: Arc::new(credential),
    });
    self
  }

  /// Adds a default header, replacing any earlier value for the same name.
  pub fn header(self, name: &str, value: &str) -> Self {
    self.header_values(name, [value])
  }

  /// Adds a multi-valued default header, replacing any earlier value for the same name.
  pub fn header_values<I, V>(mut self, name: &str, values: I) -> Self
  where
    I: IntoIterator<Item = V>,
    V: Into<String>,
  {
    let values: Vec<String> = values.into_iter().map(Into::into).collect();
    self
      .options
      .headers
      .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
    self.options.headers.push((name.to_string(), values));
    self
  }

  /// Replaces the JSON codec.
  pub fn serializer(mut self, serializer: impl Serializer + 'static) -> Self {
    self.options.serializer = Arc::new(serializer);
    self
  }

  /// Total timeout applied to each request.
  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.options.timeout = Some(timeout);
    self
  }

  pub fn build(self) -> Result<RestClient, ConfigError> {
    RestClient::with_options(self.options)
  }
}

/// HTTP client with base-url resolution and content negotiation.
#[derive(Clone)]
pub struct RestClient {
  http: reqwest::Client,
  /// Accept, User-Agent and extra headers, sent with every request.
  headers: HeaderMap,
  options: Arc<ClientOptions>,
}

impl RestClient {
  pub fn builder() -> RestClientBuilder {
    RestClientBuilder::default()
  }

  /// Create a client from the `api` section of the configuration file.
  ///
  /// The token is read from the environment on every request, so it can be
  /// rotated without rebuilding the client.
  pub fn from_config(config: &ApiConfig) -> Result<Self, ConfigError> {
    let mut builder = Self::builder().default_base_url(&config.base_url)?;

    if let Some(agent) = &config.user_agent {
      builder = builder.user_agent(&agent.name, agent.version.as_deref());
    }
    if let Some(auth) = &config.auth {
      let token_env = auth.token_env.clone();
      builder = builder.authorization(&auth.scheme, move || {
        std::env::var(&token_env).unwrap_or_default()
      });
    }
    for (name, values) in &config.headers {
      builder = builder.header_values(name, values.to_vec());
    }
    if let Some(secs) = config.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }

    builder.build()
  }

  fn with_options(options: ClientOptions) -> Result<Self, ConfigError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    if let Some(agent) = &options.user_agent {
      headers.insert(USER_AGENT, header_value("user-agent", agent)?);
    }
    for (name, values) in &options.headers {
      let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ConfigError::InvalidHeaderName(name.clone()))?;
      for value in values {
        headers.append(header_name.clone(), header_value(name, value)?);
      }
    }

    let mut http = reqwest::Client::builder();
    if let Some(timeout) = options.timeout {
      http = http.timeout(timeout);
    }
    let http = http.build().map_err(ConfigError::Client)?;

    Ok(Self {
      http,
      headers,
      options: Arc::new(options),
    })
  }

  /// Resolve `path` to the address a request would be sent to.
  ///
  /// Absolute urls are used verbatim. Anything else must start with '/' and is
  /// appended to the default base url.
  pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
    if let Ok(url) = Url::parse(path) {
      return Ok(url);
    }

    if !path.starts_with('/') {
      return Err(ConfigError::RelativePath(path.to_string()));
    }
    // The stored base already ends with exactly one '/'.
    let relative = path.trim_start_matches('/');
    let base = self
      .options
      .base_url
      .as_deref()
      .ok_or_else(|| ConfigError::MissingBaseUrl(path.to_string()))?;

    let joined = format!("{}{}", base, relative);
    Url::parse(&joined).map_err(|source| ConfigError::InvalidUrl {
      url: joined,
      source,
    })
  }

  async fn execute(
    &self,
    method: Method,
    path: &str,
    body: Body,
  ) -> Result<reqwest::Response, TransportError> {
    let url = self.resolve(path)?;
    let mut request = self
      .http
      .request(method.clone(), url.clone())
      .headers(self.headers.clone());

    if let Some(auth) = &self.options.authorization {
      let value = format!("{} {}", auth.scheme, (auth.credential)());
      request = request.header(AUTHORIZATION, header_value("authorization", &value)?);
    }

    request = match body {
      Body::Empty => request,
      Body::Form(fields) => request.form(&fields),
      Body::Text(text) => request
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(text),
      Body::Bytes(bytes) => request.body(bytes),
      Body::Stream(stream) => request.body(stream),
      Body::Json(value) => {
        let text = self
          .options
          .serializer
          .serialize(&value)
          .map_err(TransportError::Codec)?;
        request
          .header(CONTENT_TYPE, "application/json; charset=utf-8")
          .body(text)
      }
    };

    debug!(%method, %url, "sending request");
    let response = request.send().await?;
    trace!(status = %response.status(), %url, "received response");

    Ok(response)
  }

  async fn send<T: FromResponse>(
    &self,
    method: Method,
    path: &str,
    body: Body,
  ) -> Result<Envelope<T>, TransportError> {
    let response = self.execute(method, path, body).await?;
    let status = response.status();

    let payload = match T::SHAPE {
      Shape::Stream => RawPayload::Stream(ResponseStream::from_response(response)),
      _ if !status.is_success() => {
        debug!(%status, "unsuccessful response, body not decoded");
        return Ok(Envelope::unsuccessful(status));
      }
      // JSON is decoded from the raw bytes so invalid UTF-8 is rejected, not replaced.
      Shape::Bytes | Shape::Json => RawPayload::Bytes(response.bytes().await?),
      Shape::Text => RawPayload::Text(response.text().await?),
      Shape::Discard => RawPayload::Empty,
    };

    let data = T::from_payload(payload, self.options.serializer.as_ref())?;
    Ok(Envelope::new(status, Some(data)))
  }
}

impl fmt::Debug for RestClient {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RestClient")
      .field("options", &self.options)
      .finish_non_exhaustive()
  }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, ConfigError> {
  HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeaderValue(name.to_string()))
}

#[async_trait]
impl Transport for RestClient {
  async fn get_as<T: FromResponse>(&self, path: &str) -> Result<Envelope<T>, TransportError> {
    self.send(Method::GET, path, Body::Empty).await
  }

  async fn post<T: FromResponse>(&self, path: &str, body: Body) -> Result<Envelope<T>, TransportError> {
    self.send(Method::POST, path, body).await
  }

  async fn put<T: FromResponse>(&self, path: &str, body: Body) -> Result<Envelope<T>, TransportError> {
    self.send(Method::PUT, path, body).await
  }

  async fn delete(&self, path: &str) -> Result<Envelope, TransportError> {
    self.send(Method::DELETE, path, Body::Empty).await
  }
}
