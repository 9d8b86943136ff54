//! Time-based response caching.
//!
//! - Each entry carries its own TTL, defaulting to the store-wide value
//! - Expired entries are dropped lazily when their key is next touched
//! - `CacheLayer` wraps the store with the cache-first read path

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheEntry, CacheStore};
pub use traits::{CacheResult, CacheSource};
