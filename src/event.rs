use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

/// Name of the event emitted when the dashboard data changed server-side.
pub const DASHBOARD_UPDATE: &str = "dashboardUpdate";

/// A push notification republished to UI listeners
#[derive(Debug, Clone, Serialize)]
pub struct UpdateEvent {
  pub name: &'static str,
  pub payload: Value,
  pub received_at: DateTime<Utc>,
}

impl UpdateEvent {
  pub fn dashboard_update(payload: Value) -> Self {
    Self {
      name: DASHBOARD_UPDATE,
      payload,
      received_at: Utc::now(),
    }
  }
}

/// Fan-out channel for update events.
///
/// Publishing is fire-and-forget: with no subscribers the event is dropped.
/// Slow subscribers that fall more than `capacity` events behind observe a
/// `Lagged` error on their next receive.
#[derive(Debug, Clone)]
pub struct UpdateBus {
  tx: broadcast::Sender<UpdateEvent>,
}

impl UpdateBus {
  pub fn new(capacity: usize) -> Self {
    let (tx, _rx) = broadcast::channel(capacity.max(1));
    Self { tx }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
    self.tx.subscribe()
  }

  /// Publish an event, returning how many subscribers received it.
  pub fn publish(&self, event: UpdateEvent) -> usize {
    self.tx.send(event).unwrap_or(0)
  }

  pub fn subscriber_count(&self) -> usize {
    self.tx.receiver_count()
  }
}

impl Default for UpdateBus {
  fn default() -> Self {
    Self::new(64)
  }
}
