use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::board::DEFAULT_STATUS_FIELD;
use crate::sync::DEFAULT_MAX_PUSH_FAILURES;

pub const DEFAULT_API_URL: &str = "https://api.github.com/graphql";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub github: GitHubConfig,
  /// Node id of the project to open (e.g. "PVT_kwDOAB...")
  pub project: Option<String>,
  #[serde(default)]
  pub sync: SyncConfig,
  #[serde(default)]
  pub board: BoardConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
  /// GraphQL endpoint, for GitHub Enterprise installs
  pub api_url: Option<String>,
}

impl GitHubConfig {
  pub fn endpoint(&self) -> Result<Url> {
    let raw = self.api_url.as_deref().unwrap_or(DEFAULT_API_URL);
    Url::parse(raw).map_err(|e| eyre!("Invalid GitHub API URL {}: {}", raw, e))
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
  /// Seconds between background syncs; 0 disables auto-sync
  #[serde(default = "default_interval")]
  pub interval_seconds: u64,
  #[serde(default = "default_cache_ttl")]
  pub cache_ttl_seconds: u64,
  /// Failed pushes before an edit is reported as unsynced
  #[serde(default = "default_max_push_failures")]
  pub max_push_failures: u32,
}

fn default_interval() -> u64 {
  60
}

fn default_cache_ttl() -> u64 {
  300
}

fn default_max_push_failures() -> u32 {
  DEFAULT_MAX_PUSH_FAILURES
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      interval_seconds: default_interval(),
      cache_ttl_seconds: default_cache_ttl(),
      max_push_failures: default_max_push_failures(),
    }
  }
}

impl SyncConfig {
  pub fn cache_ttl(&self) -> Duration {
    Duration::from_secs(self.cache_ttl_seconds)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoardConfig {
  /// Single-select field whose options become columns
  #[serde(default = "default_status_field")]
  pub status_field: String,
}

fn default_status_field() -> String {
  DEFAULT_STATUS_FIELD.to_string()
}

impl Default for BoardConfig {
  fn default() -> Self {
    Self {
      status_field: default_status_field(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./ghkanban.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/ghkanban/config.yaml
  ///
  /// Without any file the defaults are used, so a project given on the
  /// command line is enough to run.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    if let Some(p) = explicit_path {
      if !p.exists() {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
      return Self::load_from_path(p);
    }

    match Self::find_config_file() {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("ghkanban.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("ghkanban").join("config.yaml");
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
    let config: Config = serde_yaml::from_str(contents)?;
    config.github.endpoint()?;
    Ok(config)
  }

  /// Get the GitHub token from environment variables.
  ///
  /// Checks GHKANBAN_TOKEN first, then GITHUB_TOKEN as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("GHKANBAN_TOKEN")
      .or_else(|_| std::env::var("GITHUB_TOKEN"))
      .map_err(|_| {
        eyre!("GitHub token not found. Set GHKANBAN_TOKEN or GITHUB_TOKEN environment variable.")
      })
  }
}
