use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub remote: RemoteConfig,
  #[serde(default)]
  pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
  /// API root, e.g. "http://localhost:8000"
  pub base_url: String,
  /// Collection path below the API root
  #[serde(default = "default_resource")]
  pub resource: String,
  /// Per-request timeout enforced by the HTTP client
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// How long a fetched list is served without asking the server
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_secs: default_ttl_secs(),
    }
  }
}

fn default_resource() -> String {
  "inventory".to_string()
}

fn default_timeout_secs() -> u64 {
  10
}

fn default_ttl_secs() -> u64 {
  30
}

fn search_paths() -> Vec<PathBuf> {
  let mut paths = vec![PathBuf::from("stockpile.yaml")];
  if let Some(config_dir) = dirs::config_dir() {
    paths.push(config_dir.join("stockpile").join("config.yaml"));
  }
  paths
}

fn first_existing(paths: &[PathBuf]) -> Result<PathBuf> {
  paths.iter().find(|p| p.exists()).cloned().ok_or_else(|| {
    let tried: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
    eyre!(
      "No configuration file found (tried {}). Create one or pass --base-url.",
      tried.join(", ")
    )
  })
}

impl RemoteConfig {
  pub fn base_url(&self) -> Result<Url> {
    Url::parse(&self.base_url).map_err(|e| eyre!("Invalid base_url '{}': {}", self.base_url, e))
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

impl CacheConfig {
  pub fn ttl(&self) -> Duration {
    Duration::from_secs(self.ttl_secs)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./stockpile.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/stockpile/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = match explicit_path {
      Some(p) if !p.exists() => return Err(eyre!("Config file not found: {}", p.display())),
      Some(p) => p.to_path_buf(),
      None => first_existing(&search_paths())?,
    };
    Self::load_from_path(&path)
  }

  /// Configuration with defaults around a base url.
  pub fn with_base_url(base_url: impl Into<String>) -> Self {
    Self {
      remote: RemoteConfig {
        base_url: base_url.into(),
        resource: default_resource(),
        timeout_secs: default_timeout_secs(),
      },
      cache: CacheConfig::default(),
    }
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    config.remote.base_url()?;
    Ok(config)
  }

  /// Get the API token from the environment, if one is set.
  ///
  /// Checks STOCKPILE_API_TOKEN.
  pub fn get_api_token() -> Option<String> {
    std::env::var("STOCKPILE_API_TOKEN")
      .ok()
      .filter(|t| !t.is_empty())
  }
}
