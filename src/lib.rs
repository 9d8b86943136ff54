//! Client-side data access for dashboard UIs.
//!
//! - `cache`: per-key TTL cache with lazy expiry
//! - `retry`: bounded fixed-delay retry
//! - `api`: the `DashboardApi` facade over the remote service and local fallback
//! - `live`: websocket channel that invalidates the cache and publishes updates
//! - `event`: the update bus UI listeners subscribe to

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod event;
pub mod live;
pub mod retry;

pub use api::{DashboardApi, DASHBOARD_CACHE_KEY, NOTIFICATIONS_CACHE_KEY};
pub use config::Config;
pub use error::{DashboardError, Result};
pub use event::{UpdateBus, UpdateEvent, DASHBOARD_UPDATE};
pub use live::{ConnectionState, LiveChannel};
