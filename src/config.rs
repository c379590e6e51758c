use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::{CatalogOptions, DEFAULT_PLACEHOLDER_IMAGE, DEFAULT_STALE_TIME};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub backend: BackendConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Bundled image used for items without a hero image
  #[serde(default = "default_placeholder_image")]
  pub placeholder_image: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
  /// Project URL, e.g. https://abcd.supabase.co
  pub url: String,
  /// Per-request timeout in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default = "default_stale_secs")]
  pub items_ttl_secs: u64,
  #[serde(default = "default_stale_secs")]
  pub categories_ttl_secs: u64,
  /// Keep a copy of the last catalog fetch on disk so a new process starts warm
  #[serde(default = "default_persist")]
  pub persist: bool,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      items_ttl_secs: default_stale_secs(),
      categories_ttl_secs: default_stale_secs(),
      persist: default_persist(),
    }
  }
}

fn default_placeholder_image() -> String {
  DEFAULT_PLACEHOLDER_IMAGE.to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_stale_secs() -> u64 {
  DEFAULT_STALE_TIME.as_secs()
}

fn default_persist() -> bool {
  true
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./storefront.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/storefront/config.yaml
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
        "No configuration file found. Create one at ~/.config/storefront/config.yaml\n\
                 with at least `backend: {{ url: https://<project>.supabase.co }}`."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("storefront.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("storefront").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Catalog store options derived from the cache section.
  pub fn catalog_options(&self) -> CatalogOptions {
    CatalogOptions {
      items_stale_time: Duration::from_secs(self.cache.items_ttl_secs),
      categories_stale_time: Duration::from_secs(self.cache.categories_ttl_secs),
      placeholder_image: self.placeholder_image.clone(),
    }
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.backend.timeout_secs)
  }

  /// Get the public (anon) API key from environment variables.
  ///
  /// Checks STOREFRONT_ANON_KEY first, then SUPABASE_ANON_KEY as fallback.
  pub fn get_anon_key() -> Result<String> {
    std::env::var("STOREFRONT_ANON_KEY")
      .or_else(|_| std::env::var("SUPABASE_ANON_KEY"))
      .map_err(|_| {
        eyre!("Backend API key not found. Set STOREFRONT_ANON_KEY or SUPABASE_ANON_KEY.")
      })
  }

  /// Get the signed-in user's access token, if any.
  ///
  /// Reads STOREFRONT_ACCESS_TOKEN. Without it only catalog reads work.
  pub fn get_access_token() -> Option<String> {
    std::env::var("STOREFRONT_ACCESS_TOKEN")
      .ok()
      .filter(|t| !t.trim().is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::parse("backend:\n  url: https://demo.supabase.co\n").unwrap();

    assert_eq!(config.backend.url, "https://demo.supabase.co");
    assert_eq!(config.backend.timeout_secs, 30);
    assert_eq!(config.cache.items_ttl_secs, 300);
    assert_eq!(config.cache.categories_ttl_secs, 300);
    assert!(config.cache.persist);
    assert_eq!(config.placeholder_image, DEFAULT_PLACEHOLDER_IMAGE);
  }

  #[test]
  fn test_per_entity_ttl() {
    let config = Config::parse(
      "backend:\n  url: https://demo.supabase.co\ncache:\n  categories_ttl_secs: 900\n  persist: false\n",
    )
    .unwrap();

    let options = config.catalog_options();
    assert_eq!(options.items_stale_time, Duration::from_secs(300));
    assert_eq!(options.categories_stale_time, Duration::from_secs(900));
    assert!(!config.cache.persist);
  }

  #[test]
  fn test_missing_backend_is_an_error() {
    assert!(Config::parse("cache:\n  persist: false\n").is_err());
  }
}
