use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Root for relative paths, without a trailing '/'
  pub base_url: String,
  pub user_agent: Option<UserAgentConfig>,
  pub auth: Option<AuthConfig>,
  /// Extra default headers; each entry is a single value or a list
  #[serde(default)]
  pub headers: BTreeMap<String, HeaderValues>,
  /// Per-request timeout in seconds
  pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
  pub name: String,
  pub version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
  /// Authorization scheme, e.g. "Bearer"
  #[serde(default = "default_scheme")]
  pub scheme: String,
  /// Environment variable holding the credential, read on every request
  #[serde(default = "default_token_env")]
  pub token_env: String,
}

fn default_scheme() -> String {
  "Bearer".to_string()
}

fn default_token_env() -> String {
  "RESTCACHE_TOKEN".to_string()
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum HeaderValues {
  One(String),
  Many(Vec<String>),
}

impl HeaderValues {
  pub fn to_vec(&self) -> Vec<String> {
    match self {
      HeaderValues::One(value) => vec![value.clone()],
      HeaderValues::Many(values) => values.clone(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Disable to always read through to the API and never store anything
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Database location (default: $XDG_DATA_HOME/restcache/cache.db)
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      path: None,
    }
  }
}

fn default_true() -> bool {
  true
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./restcache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/restcache/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/restcache/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("restcache.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("restcache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn parse(contents: &str) -> Result<Self> {
    Ok(serde_yaml::from_str(contents)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_full_config() {
    let config = Config::parse(
      r#"
api:
  base_url: https://api.example.com
  user_agent:
    name: restcache
    version: "0.1"
  auth:
    scheme: Token
    token_env: EXAMPLE_TOKEN
  headers:
    X-Tenant: acme
    X-Feature: [a, b]
  timeout_secs: 10
cache:
  enabled: false
  path: /tmp/cache.db
"#,
    )
    .unwrap();

    assert_eq!(config.api.base_url, "https://api.example.com");
    assert_eq!(config.api.auth.unwrap().token_env, "EXAMPLE_TOKEN");
    assert_eq!(config.api.headers["X-Tenant"].to_vec(), vec!["acme"]);
    assert_eq!(config.api.headers["X-Feature"].to_vec(), vec!["a", "b"]);
    assert!(!config.cache.enabled);
  }

  #[test]
  fn test_defaults() {
    let config = Config::parse(
      r#"
api:
  base_url: http://localhost:8080
  auth: {}
"#,
    )
    .unwrap();

    let auth = config.api.auth.unwrap();
    assert_eq!(auth.scheme, "Bearer");
    assert_eq!(auth.token_env, "RESTCACHE_TOKEN");
    assert!(config.cache.enabled);
    assert!(config.cache.path.is_none());
  }

  #[test]
  fn test_missing_explicit_path() {
    let err = Config::load(Some(Path::new("/nonexistent/restcache.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
