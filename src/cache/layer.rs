//! Cache layer that orchestrates cache lookups with fetching.

use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::storage::CacheStore;
use super::traits::CacheResult;
use crate::error::Result;

/// Cache-first read path shared by every cached resource.
#[derive(Clone)]
pub struct CacheLayer {
  store: Arc<CacheStore>,
}

impl CacheLayer {
  pub fn new(store: Arc<CacheStore>) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &Arc<CacheStore> {
    &self.store
  }

  /// Fetch a value with a cache-first strategy.
  ///
  /// 1. Check cache - if the entry is within its TTL, return it
  /// 2. Otherwise run the fetcher
  /// 3. On success, store the result under `key` with `ttl`
  /// 4. On failure, nothing is cached and the error is returned
  pub async fn fetch<F, Fut>(
    &self,
    key: &str,
    ttl: Duration,
    fetcher: F,
  ) -> Result<CacheResult<Value>>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<CacheResult<Value>>>,
  {
    if let Some(cached) = self.store.get(key) {
      tracing::debug!(key, "cache hit");
      return Ok(CacheResult::from_cache(cached));
    }

    let result = fetcher().await?;
    self.store.set_with_ttl(key, result.data.clone(), ttl);
    Ok(result)
  }
}
