use clap::{Parser, Subcommand};
use color_eyre::Result;
use restcache::record::content_key;
use restcache::{
  CachePort, Config, FetchStrategy, Fetcher, ManualReachability, NoopCache, QuerySpec, Record,
  RestClient, SqliteCache, Transport,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "restcache")]
#[command(about = "Fetch records from a REST API with an offline SQLite cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/restcache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Write logs to this file instead of stderr
  #[arg(long)]
  log_file: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Issue a GET and print the status and raw body
  Get {
    /// Absolute url or path relative to the configured base url
    path: String,
  },
  /// Fetch a JSON array of documents through the cache
  Fetch {
    /// API path returning a JSON array
    path: String,
    /// SQL predicate over the cached `data` column
    #[arg(long = "where")]
    filter: Option<String>,
    /// Value bound to a `?` in the predicate (JSON, or a plain string)
    #[arg(long = "param", requires = "filter")]
    params: Vec<String>,
    /// Do not call the API
    #[arg(long)]
    cache_only: bool,
    /// Behave as if the network were unreachable
    #[arg(long)]
    offline: bool,
  },
  /// Delete every cached document
  Purge,
}

/// Untyped JSON document, keyed by its `id` field when it has one.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
struct Document(Value);

impl Record for Document {
  fn entity_type() -> &'static str {
    "document"
  }

  fn record_key(&self) -> String {
    match self.0.get("id") {
      Some(Value::String(id)) => id.clone(),
      Some(id) if !id.is_null() => id.to_string(),
      _ => content_key(&self.0),
    }
  }
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<tracing_appender::non_blocking::WorkerGuard> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("restcache=info"));

  let (writer, guard) = match log_file {
    Some(path) => {
      let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
      let name = path
        .file_name()
        .ok_or_else(|| color_eyre::eyre::eyre!("Invalid log file path: {}", path.display()))?;
      let appender = tracing_appender::rolling::never(dir.unwrap_or(std::path::Path::new(".")), name);
      tracing_appender::non_blocking(appender)
    }
    None => tracing_appender::non_blocking(std::io::stderr()),
  };

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(log_file.is_none())
    .init();

  Ok(guard)
}

fn parse_param(raw: &str) -> Value {
  serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

async fn fetch<C: CachePort>(
  client: RestClient,
  cache: C,
  spec: QuerySpec,
  strategy: FetchStrategy,
  offline: bool,
) -> Result<()> {
  let fetcher = Fetcher::new(client, cache, ManualReachability::new(!offline));
  let documents: Vec<Document> = fetcher.fetch_with(&spec, strategy).await?;

  for document in &documents {
    println!("{}", serde_json::to_string(&document.0)?);
  }
  tracing::info!(count = documents.len(), "fetch complete");

  Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = init_logging(args.log_file.as_ref())?;

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let client = RestClient::from_config(&config.api)?;

  match args.command {
    Command::Get { path } => {
      let response = client.get_as::<String>(&path).await?;
      println!("{}", response.status());
      if let Some(body) = response.data() {
        println!("{}", body);
      }
    }
    Command::Fetch {
      path,
      filter,
      params,
      cache_only,
      offline,
    } => {
      let mut spec = QuerySpec::new(path);
      if let Some(filter) = filter {
        spec = spec.filter(filter, params.iter().map(|p| parse_param(p)).collect());
      }
      let strategy = if cache_only {
        FetchStrategy::CacheOnly
      } else {
        FetchStrategy::ApiThenCache
      };

      if config.cache.enabled {
        let cache = match &config.cache.path {
          Some(path) => SqliteCache::open_at(path)?,
          None => SqliteCache::open()?,
        };
        fetch(client, cache, spec, strategy, offline).await?;
      } else {
        fetch(client, NoopCache, spec, strategy, offline).await?;
      }
    }
    Command::Purge => {
      let cache = match &config.cache.path {
        Some(path) => SqliteCache::open_at(path)?,
        None => SqliteCache::open()?,
      };
      let removed = cache.purge::<Document>()?;
      println!("removed {} cached documents", removed);
    }
  }

  Ok(())
}
