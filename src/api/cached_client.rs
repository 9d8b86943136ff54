//! Cached dashboard client: the data access facade used by the UI.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, warn};

use super::client::DashboardClient;
use super::transport::HttpTransport;
use super::{DASHBOARD_CACHE_KEY, NOTIFICATIONS_CACHE_KEY};
use crate::cache::{CacheLayer, CacheResult, CacheStore};
use crate::config::Config;
use crate::error::Result;
use crate::event::{UpdateBus, UpdateEvent};
use crate::live::{Connector, LiveChannel, WsConnector};

/// Dashboard client with transparent caching and per-resource failure policy.
///
/// - Snapshot: remote, then local fallback; errors propagate
/// - Notifications: best effort; failures yield an empty, uncached list
/// - Metrics push: remote only; success invalidates the snapshot
#[derive(Clone)]
pub struct DashboardApi {
  inner: DashboardClient,
  cache: CacheLayer,
  notifications_ttl: Duration,
  bus: UpdateBus,
}

impl DashboardApi {
  pub fn new(inner: DashboardClient, store: Arc<CacheStore>, notifications_ttl: Duration) -> Self {
    Self {
      inner,
      cache: CacheLayer::new(store),
      notifications_ttl,
      bus: UpdateBus::default(),
    }
  }

  /// Build the HTTP-backed facade described by `config`.
  pub fn from_config(config: &Config) -> Result<Self> {
    let transport = HttpTransport::new(config.api.request_timeout())?;
    let inner = DashboardClient::new(
      Arc::new(transport),
      &config.api.base_url,
      config.retry.policy(),
      config.api.fallback_source(),
    );
    let store = Arc::new(CacheStore::new(config.cache.default_ttl()));

    Ok(Self::new(inner, store, config.cache.notifications_ttl()))
  }

  pub fn store(&self) -> &Arc<CacheStore> {
    self.cache.store()
  }

  pub fn bus(&self) -> &UpdateBus {
    &self.bus
  }

  /// Receive `dashboardUpdate` events pushed by the live channel.
  pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
    self.bus.subscribe()
  }

  /// Live channel sharing this facade's cache and update bus.
  pub fn live_channel(
    &self,
    connector: Arc<dyn Connector>,
    reconnect_delay: Duration,
  ) -> Arc<LiveChannel> {
    LiveChannel::new(
      connector,
      Arc::clone(self.store()),
      self.bus.clone(),
      reconnect_delay,
    )
  }

  /// Websocket live channel described by `config`.
  pub fn live_channel_from_config(&self, config: &Config) -> Arc<LiveChannel> {
    let connector = WsConnector::new(&config.live.url, config.live.enabled);
    self.live_channel(Arc::new(connector), config.live.reconnect_delay())
  }

  /// Fetch the dashboard snapshot, falling back to local data.
  pub async fn fetch_dashboard_snapshot(&self) -> Result<CacheResult<Value>> {
    let ttl = self.store().default_ttl();

    self
      .cache
      .fetch(DASHBOARD_CACHE_KEY, ttl, || async {
        match self.inner.get_dashboard().await {
          Ok(data) => Ok(CacheResult::from_network(data)),
          Err(e) => {
            warn!(error = %e, "API not available, falling back to local data");
            let data = self.inner.read_local_data().await?;
            Ok(CacheResult::from_fallback(data))
          }
        }
      })
      .await
      .map_err(|e| {
        error!(error = %e, "Failed to fetch dashboard data");
        e
      })
  }

  /// Fetch notifications; any failure degrades to an empty list.
  pub async fn fetch_notifications(&self) -> Vec<Value> {
    let result = self
      .cache
      .fetch(NOTIFICATIONS_CACHE_KEY, self.notifications_ttl, || async {
        let items = self.inner.get_notifications().await?;
        Ok(CacheResult::from_network(Value::Array(items)))
      })
      .await;

    match result {
      Ok(CacheResult {
        data: Value::Array(items),
        ..
      }) => items,
      Ok(_) => Vec::new(),
      Err(e) => {
        error!(error = %e, "Failed to fetch notifications");
        Vec::new()
      }
    }
  }

  /// Push metrics to the service and drop the now-stale snapshot.
  pub async fn push_metrics_update(&self, metrics: &Value) -> Result<Value> {
    match self.inner.post_metrics(metrics).await {
      Ok(ack) => {
        self.store().invalidate(DASHBOARD_CACHE_KEY);
        Ok(ack)
      }
      Err(e) => {
        error!(error = %e, "Failed to update metrics");
        Err(e)
      }
    }
  }

  pub fn invalidate(&self, key: &str) {
    self.store().invalidate(key);
  }

  pub fn clear_cache(&self) {
    self.store().clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::client::FallbackSource;
  use crate::api::testing::FakeTransport;
  use crate::api::Transport;
  use crate::cache::CacheSource;
  use crate::error::DashboardError;
  use crate::retry::RetryPolicy;
  use serde_json::json;

  const DASHBOARD: &str = "http://dash.local/api/dashboard";
  const NOTIFICATIONS: &str = "http://dash.local/api/notifications";
  const METRICS: &str = "http://dash.local/api/metrics";
  const LOCAL: &str = "http://dash.local/data.json";

  fn api(fake: &Arc<FakeTransport>) -> DashboardApi {
    let transport: Arc<dyn Transport> = fake.clone();
    let client = DashboardClient::new(
      transport,
      "http://dash.local/api",
      RetryPolicy::default(),
      FallbackSource::Url(LOCAL.to_string()),
    );
    DashboardApi::new(
      client,
      Arc::new(CacheStore::new(Duration::from_secs(300))),
      Duration::from_secs(60),
    )
  }

  #[tokio::test(start_paused = true)]
  async fn test_snapshot_from_network_is_cached() {
    let fake = Arc::new(FakeTransport::new());
    fake.respond(DASHBOARD, Ok(json!({"stats": [1]})));
    let api = api(&fake);

    let first = api.fetch_dashboard_snapshot().await.unwrap();
    let second = api.fetch_dashboard_snapshot().await.unwrap();

    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(second.data, json!({"stats": [1]}));
    assert_eq!(fake.calls_to(DASHBOARD), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_snapshot_falls_back_to_local_and_caches() {
    let fake = Arc::new(FakeTransport::new());
    fake.fail(DASHBOARD, 503, 3);
    fake.respond(LOCAL, Ok(json!({"dashboard": "local"})));
    let api = api(&fake);

    let first = api.fetch_dashboard_snapshot().await.unwrap();
    assert_eq!(first.source, CacheSource::LocalFallback);
    assert_eq!(first.data, json!({"dashboard": "local"}));
    assert_eq!(
      api.store().get(DASHBOARD_CACHE_KEY),
      Some(json!({"dashboard": "local"}))
    );

    let second = api.fetch_dashboard_snapshot().await.unwrap();
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(second.data, json!({"dashboard": "local"}));

    // Neither source touched by the cached read
    assert_eq!(fake.calls_to(DASHBOARD), 3);
    assert_eq!(fake.calls_to(LOCAL), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_snapshot_error_when_both_sources_fail() {
    let fake = Arc::new(FakeTransport::new());
    fake.fail(DASHBOARD, 500, 3);
    fake.fail(LOCAL, 404, 1);
    let api = api(&fake);

    let err = api.fetch_dashboard_snapshot().await.unwrap_err();

    assert!(matches!(err, DashboardError::HttpStatus { status: 404, .. }));
    assert!(!api.store().contains(DASHBOARD_CACHE_KEY));
  }

  #[tokio::test(start_paused = true)]
  async fn test_snapshot_refetched_after_ttl() {
    let fake = Arc::new(FakeTransport::new());
    fake.respond(DASHBOARD, Ok(json!(1)));
    fake.respond(DASHBOARD, Ok(json!(2)));
    let api = api(&fake);

    api.fetch_dashboard_snapshot().await.unwrap();
    tokio::time::advance(Duration::from_secs(301)).await;
    let refreshed = api.fetch_dashboard_snapshot().await.unwrap();

    assert_eq!(refreshed.data, json!(2));
    assert_eq!(fake.calls_to(DASHBOARD), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_notifications_exhausted_returns_empty_and_is_not_cached() {
    let fake = Arc::new(FakeTransport::new());
    fake.fail(NOTIFICATIONS, 502, 3);
    fake.respond(NOTIFICATIONS, Ok(json!([{"id": 1}])));
    let api = api(&fake);

    assert!(api.fetch_notifications().await.is_empty());
    assert!(!api.store().contains(NOTIFICATIONS_CACHE_KEY));
    assert_eq!(fake.calls_to(NOTIFICATIONS), 3);

    // Next call goes back to the network
    assert_eq!(api.fetch_notifications().await, vec![json!({"id": 1})]);
    assert_eq!(fake.calls_to(NOTIFICATIONS), 4);
  }

  #[tokio::test(start_paused = true)]
  async fn test_notifications_use_short_ttl() {
    let fake = Arc::new(FakeTransport::new());
    fake.respond(NOTIFICATIONS, Ok(json!([{"id": 1}])));
    fake.respond(NOTIFICATIONS, Ok(json!([{"id": 2}])));
    fake.respond(DASHBOARD, Ok(json!({"stats": []})));
    let api = api(&fake);

    api.fetch_dashboard_snapshot().await.unwrap();
    assert_eq!(api.fetch_notifications().await, vec![json!({"id": 1})]);
    assert_eq!(api.fetch_notifications().await, vec![json!({"id": 1})]);

    tokio::time::advance(Duration::from_secs(61)).await;

    assert_eq!(api.fetch_notifications().await, vec![json!({"id": 2})]);
    assert!(api.store().contains(DASHBOARD_CACHE_KEY));
    assert_eq!(fake.calls_to(NOTIFICATIONS), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_push_metrics_invalidates_snapshot() {
    let fake = Arc::new(FakeTransport::new());
    fake.respond(DASHBOARD, Ok(json!({"stats": []})));
    fake.respond(METRICS, Ok(json!({"accepted": true})));
    let api = api(&fake);

    api.fetch_dashboard_snapshot().await.unwrap();
    assert!(api.store().contains(DASHBOARD_CACHE_KEY));

    let ack = api.push_metrics_update(&json!({"orders": 3})).await.unwrap();

    assert_eq!(ack, json!({"accepted": true}));
    assert!(!api.store().contains(DASHBOARD_CACHE_KEY));
  }

  #[tokio::test(start_paused = true)]
  async fn test_push_metrics_failure_propagates_and_keeps_cache() {
    let fake = Arc::new(FakeTransport::new());
    fake.respond(DASHBOARD, Ok(json!({"stats": []})));
    fake.fail(METRICS, 500, 3);
    let api = api(&fake);

    api.fetch_dashboard_snapshot().await.unwrap();
    let err = api.push_metrics_update(&json!({"orders": 3})).await.unwrap_err();

    assert!(err.is_exhausted());
    assert!(api.store().contains(DASHBOARD_CACHE_KEY));
    assert_eq!(fake.calls_to(METRICS), 3);
  }

  #[tokio::test]
  async fn test_clear_cache() {
    let fake = Arc::new(FakeTransport::new());
    let api = api(&fake);
    api.store().set(DASHBOARD_CACHE_KEY, json!(1));
    api.store().set(NOTIFICATIONS_CACHE_KEY, json!([]));

    api.invalidate(NOTIFICATIONS_CACHE_KEY);
    assert_eq!(api.store().len(), 1);

    api.clear_cache();
    assert!(api.store().is_empty());
  }
}
