use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::FallbackSource;
use crate::error::{DashboardError, Result};
use crate::retry::RetryPolicy;

/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "DASHLINK_API_URL";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub api: ApiConfig,
  pub retry: RetryConfig,
  pub cache: CacheConfig,
  pub live: LiveConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  pub base_url: String,
  /// Local snapshot: a file path, or a URL when it has a scheme
  pub fallback: String,
  pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "http://localhost:8080/api".to_string(),
      fallback: "data.json".to_string(),
      request_timeout_ms: 10_000,
    }
  }
}

impl ApiConfig {
  pub fn fallback_source(&self) -> FallbackSource {
    if self.fallback.starts_with("http://") || self.fallback.starts_with("https://") {
      FallbackSource::Url(self.fallback.clone())
    } else {
      FallbackSource::File(PathBuf::from(&self.fallback))
    }
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_millis(self.request_timeout_ms)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
  pub max_attempts: u32,
  pub delay_ms: u64,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      delay_ms: 1000,
    }
  }
}

impl RetryConfig {
  pub fn policy(&self) -> RetryPolicy {
    RetryPolicy::new(self.max_attempts, Duration::from_millis(self.delay_ms))
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub default_ttl_secs: u64,
  /// Notifications go stale faster than the snapshot
  pub notifications_ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      default_ttl_secs: 5 * 60,
      notifications_ttl_secs: 60,
    }
  }
}

impl CacheConfig {
  pub fn default_ttl(&self) -> Duration {
    Duration::from_secs(self.default_ttl_secs)
  }

  pub fn notifications_ttl(&self) -> Duration {
    Duration::from_secs(self.notifications_ttl_secs)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
  pub enabled: bool,
  pub url: String,
  pub reconnect_delay_ms: u64,
}

impl Default for LiveConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      url: "ws://localhost:8080/dashboard".to_string(),
      reconnect_delay_ms: 5000,
    }
  }
}

impl LiveConfig {
  pub fn reconnect_delay(&self) -> Duration {
    Duration::from_millis(self.reconnect_delay_ms)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./dashlink.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/dashlink/config.yaml
  ///
  /// With no file found, defaults are used. `DASHLINK_API_URL` overrides the
  /// base URL in every case.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(DashboardError::Config(format!(
          "Config file not found: {}",
          p.display()
        )));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    if let Ok(url) = std::env::var(API_URL_ENV) {
      config.api.base_url = url;
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("dashlink.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("dashlink").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
      DashboardError::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    serde_yaml::from_str(&contents).map_err(|e| {
      DashboardError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    serde_yaml::from_str(contents)
      .map_err(|e| DashboardError::Config(format!("Failed to parse config: {}", e)))
  }
}
