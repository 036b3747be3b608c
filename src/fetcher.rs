//! Fetch engine: API-first reads with write-through to, and fallback on, the local cache.

use tracing::{debug, warn};

use crate::cache::CachePort;
use crate::error::{BoxError, FetchError};
use crate::network::Reachability;
use crate::record::Record;
use crate::specification::Specification;
use crate::transport::Transport;

/// Where a fetch is allowed to read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchStrategy {
  /// If the network is connected, fetch from the API and store the result in
  /// the cache; fall back to the cache when the API answers with an error status.
  #[default]
  ApiThenCache,
  /// Go straight to the cache.
  CacheOnly,
}

/// Answers "all records matching this specification" from the API or the cache.
pub struct Fetcher<T, C, N> {
  transport: T,
  cache: C,
  network: N,
}

impl<T, C, N> Fetcher<T, C, N>
where
  T: Transport,
  C: CachePort,
  N: Reachability,
{
  pub fn new(transport: T, cache: C, network: N) -> Self {
    Self {
      transport,
      cache,
      network,
    }
  }

  pub fn transport(&self) -> &T {
    &self.transport
  }

  pub fn cache(&self) -> &C {
    &self.cache
  }

  pub fn network(&self) -> &N {
    &self.network
  }

  /// Fetch with [`FetchStrategy::ApiThenCache`].
  pub async fn fetch<R, S>(&self, spec: &S) -> Result<Vec<R>, FetchError>
  where
    R: Record,
    S: Specification + ?Sized,
  {
    self.fetch_with(spec, FetchStrategy::default()).await
  }

  /// Fetch all records matching `spec`.
  ///
  /// When the network is down the strategy is forced to
  /// [`FetchStrategy::CacheOnly`]. An error status from the API is not a
  /// failure: the cache answers instead. Any error raised by a collaborator
  /// is returned as a single [`FetchError`] and no records are returned.
  pub async fn fetch_with<R, S>(&self, spec: &S, strategy: FetchStrategy) -> Result<Vec<R>, FetchError>
  where
    R: Record,
    S: Specification + ?Sized,
  {
    self.try_fetch(spec, strategy).await.map_err(|cause| {
      warn!(entity_type = R::entity_type(), error = %cause, "fetch failed");
      FetchError::new(cause)
    })
  }

  async fn try_fetch<R, S>(&self, spec: &S, strategy: FetchStrategy) -> Result<Vec<R>, BoxError>
  where
    R: Record,
    S: Specification + ?Sized,
  {
    let strategy = if self.network.is_connected()? {
      strategy
    } else {
      debug!("network unreachable, reading from cache");
      FetchStrategy::CacheOnly
    };

    match strategy {
      FetchStrategy::ApiThenCache => self.fetch_from_api_and_cache(spec).await,
      FetchStrategy::CacheOnly => self.fetch_from_cache(spec).await,
    }
  }

  async fn fetch_from_api_and_cache<R, S>(&self, spec: &S) -> Result<Vec<R>, BoxError>
  where
    R: Record,
    S: Specification + ?Sized,
  {
    let path = spec.api_path();
    let response = self.transport.get_json::<Vec<R>>(&path).await?;

    if !response.is_success() {
      debug!(
        %path,
        status = response.status_code(),
        "api answered with an error status, falling back to cache"
      );
      return self.fetch_from_cache(spec).await;
    }

    let records = response.into_data().unwrap_or_default();
    self.cache.insert_or_replace_all(&records).await?;
    debug!(%path, count = records.len(), "fetched from api");

    Ok(records)
  }

  async fn fetch_from_cache<R, S>(&self, spec: &S) -> Result<Vec<R>, BoxError>
  where
    R: Record,
    S: Specification + ?Sized,
  {
    let records = self.cache.fetch_by_specification::<R, S>(spec).await?;
    Ok(records)
  }
}
