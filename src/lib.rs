//! Offline-capable data access for REST APIs.
//!
//! A [`Fetcher`] answers "all records matching this specification" by calling
//! the API through a [`Transport`] and writing the result through to a
//! [`CachePort`], or by reading the cache when the network is down, the caller
//! asks for [`FetchStrategy::CacheOnly`], or the API answers with an error
//! status.
//!
//! ```ignore
//! let client = RestClient::builder()
//!   .default_base_url("https://api.example.com")?
//!   .authorization("Bearer", || token_store.current())
//!   .build()?;
//! let fetcher = Fetcher::new(client, SqliteCache::open()?, ManualReachability::default());
//!
//! let spec = QuerySpec::new("/posts?userId=1")
//!   .filter("json_extract(data, '$.userId') = ?", vec![json!(1)]);
//! let posts: Vec<Post> = fetcher.fetch(&spec).await?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod network;
pub mod record;
pub mod specification;
pub mod transport;

pub use cache::{CachePort, NoopCache, SqliteCache};
pub use config::Config;
pub use error::{ConfigError, FetchError, TransportError};
pub use fetcher::{FetchStrategy, Fetcher};
pub use network::{ManualReachability, Reachability};
pub use record::Record;
pub use specification::{QuerySpec, Specification};
pub use transport::{Body, Envelope, Json, ResponseStream, RestClient, Transport};
