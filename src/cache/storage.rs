//! In-memory cache store with per-entry expiry.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// A single cached value and the window it stays valid for.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub key: String,
  pub value: Value,
  pub stored_at: Instant,
  pub ttl: Duration,
}

impl CacheEntry {
  /// An entry is valid while `now - stored_at <= ttl`.
  pub fn is_expired(&self, now: Instant) -> bool {
    now.saturating_duration_since(self.stored_at) > self.ttl
  }
}

/// Key-value store where each entry carries its own TTL.
///
/// Expiry is checked lazily: an expired entry is purged the next time its key
/// is read or written, never by a background sweep.
#[derive(Debug)]
pub struct CacheStore {
  entries: Mutex<HashMap<String, CacheEntry>>,
  default_ttl: Duration,
}

impl CacheStore {
  pub fn new(default_ttl: Duration) -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
      default_ttl,
    }
  }

  pub fn default_ttl(&self) -> Duration {
    self.default_ttl
  }

  // No critical section spans an await, so a poisoned map is still consistent.
  fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Get a live value, deleting the entry first if it has expired.
  pub fn get(&self, key: &str) -> Option<Value> {
    let mut entries = self.lock();
    let now = Instant::now();

    match entries.get(key) {
      Some(entry) if entry.is_expired(now) => {
        entries.remove(key);
        tracing::debug!(key, "cache entry expired");
        None
      }
      Some(entry) => Some(entry.value.clone()),
      None => None,
    }
  }

  /// When the live entry under `key` was stored.
  pub fn stored_at(&self, key: &str) -> Option<Instant> {
    let entries = self.lock();
    entries
      .get(key)
      .filter(|e| !e.is_expired(Instant::now()))
      .map(|e| e.stored_at)
  }

  /// Store with the default TTL.
  pub fn set(&self, key: &str, value: Value) {
    self.set_with_ttl(key, value, self.default_ttl);
  }

  /// Store with an explicit TTL, replacing any previous entry.
  pub fn set_with_ttl(&self, key: &str, value: Value, ttl: Duration) {
    let entry = CacheEntry {
      key: key.to_string(),
      value,
      stored_at: Instant::now(),
      ttl,
    };
    self.lock().insert(key.to_string(), entry);
  }

  pub fn invalidate(&self, key: &str) {
    if self.lock().remove(key).is_some() {
      tracing::debug!(key, "cache entry invalidated");
    }
  }

  pub fn clear(&self) {
    self.lock().clear();
  }

  /// Whether raw storage holds `key`, expired or not.
  pub fn contains(&self, key: &str) -> bool {
    self.lock().contains_key(key)
  }

  /// Number of stored entries, including expired ones not yet touched.
  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl Default for CacheStore {
  fn default() -> Self {
    Self::new(Duration::from_secs(5 * 60))
  }
}
