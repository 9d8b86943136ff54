//! Result metadata for cached reads.

use chrono::{DateTime, Utc};

/// Result from a cache-backed read, including where the data came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When this result was produced
  pub fetched_at: DateTime<Utc>,
}

impl<T> CacheResult<T> {
  /// Fresh data from the remote service.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      fetched_at: Utc::now(),
    }
  }

  /// Data served from a live cache entry.
  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
      fetched_at: Utc::now(),
    }
  }

  /// Data read from the static local source after the remote path failed.
  pub fn from_fallback(data: T) -> Self {
    Self {
      data,
      source: CacheSource::LocalFallback,
      fetched_at: Utc::now(),
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheResult<U> {
    CacheResult {
      data: f(self.data),
      source: self.source,
      fetched_at: self.fetched_at,
    }
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Served from cache within its TTL
  Cache,
  /// Remote unavailable, read from local data
  LocalFallback,
}
