//! Dashboard service access: raw client, transport and the cached facade.

mod cached_client;
mod client;
mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use cached_client::DashboardApi;
pub use client::{DashboardClient, FallbackSource};
pub use transport::{FetchRequest, HttpTransport, Method, Transport};

/// Cache key of the dashboard snapshot
pub const DASHBOARD_CACHE_KEY: &str = "dashboard-data";
/// Cache key of the notification list
pub const NOTIFICATIONS_CACHE_KEY: &str = "notifications";
