use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::connector::{ConnectError, Connector, Frame, LiveStream};
use crate::api::DASHBOARD_CACHE_KEY;
use crate::cache::CacheStore;
use crate::event::{UpdateBus, UpdateEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
  Disconnected,
  Connecting,
  Connected,
  Disconnecting,
}

/// Persistent push connection that keeps the snapshot cache fresh.
///
/// Every close is followed by exactly one reconnect attempt after
/// `reconnect_delay`, forever, until `disconnect()` is called. A connector
/// reporting `Unsupported` stops the loop for good.
pub struct LiveChannel {
  connector: Arc<dyn Connector>,
  cache: Arc<CacheStore>,
  bus: UpdateBus,
  reconnect_delay: Duration,
  state: watch::Sender<ConnectionState>,
  shutdown: watch::Sender<bool>,
  task: Mutex<Option<JoinHandle<()>>>,
}

impl LiveChannel {
  pub fn new(
    connector: Arc<dyn Connector>,
    cache: Arc<CacheStore>,
    bus: UpdateBus,
    reconnect_delay: Duration,
  ) -> Arc<Self> {
    let (state, _) = watch::channel(ConnectionState::Disconnected);
    let (shutdown, _) = watch::channel(false);

    Arc::new(Self {
      connector,
      cache,
      bus,
      reconnect_delay,
      state,
      shutdown,
      task: Mutex::new(None),
    })
  }

  pub fn state(&self) -> ConnectionState {
    *self.state.borrow()
  }

  /// Observe state transitions.
  pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
    self.state.subscribe()
  }

  fn set_state(&self, state: ConnectionState) {
    let previous = self.state.send_replace(state);
    if previous != state {
      debug!(?previous, ?state, "live channel state changed");
    }
  }

  /// Start the connection loop. No-op while a loop is already running.
  pub fn connect(self: &Arc<Self>) {
    let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
    if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
      return;
    }

    self.shutdown.send_replace(false);
    let channel = Arc::clone(self);
    *task = Some(tokio::spawn(async move { channel.run().await }));
  }

  /// Close the connection and stop reconnecting.
  ///
  /// Also cancels a pending reconnect timer. Returns once the loop has ended.
  pub async fn disconnect(&self) {
    let handle = self
      .task
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .take();
    let Some(handle) = handle else {
      return;
    };

    if self.state() != ConnectionState::Disconnected {
      self.set_state(ConnectionState::Disconnecting);
    }
    self.shutdown.send_replace(true);

    if let Err(e) = handle.await {
      error!(error = %e, "Live update task failed");
    }
    self.set_state(ConnectionState::Disconnected);
    info!("Live update channel closed by caller");
  }

  async fn run(self: Arc<Self>) {
    let mut shutdown = self.shutdown.subscribe();

    loop {
      self.set_state(ConnectionState::Connecting);

      let opened = tokio::select! {
        opened = self.connector.open() => opened,
        _ = stopped(&mut shutdown) => break,
      };

      match opened {
        Ok(stream) => {
          self.set_state(ConnectionState::Connected);
          info!("Live update channel connected");
          self.pump(stream, &mut shutdown).await;
        }
        Err(ConnectError::Unsupported(reason)) => {
          warn!(%reason, "Live updates not supported");
          break;
        }
        Err(e @ ConnectError::Failed(_)) => {
          error!(error = %e, "Live update channel error");
        }
      }

      self.set_state(ConnectionState::Disconnected);
      if *shutdown.borrow() {
        break;
      }

      info!(
        delay_ms = self.reconnect_delay.as_millis() as u64,
        "Live update channel disconnected, reconnecting in {:?}",
        self.reconnect_delay
      );
      tokio::select! {
        _ = tokio::time::sleep(self.reconnect_delay) => {}
        _ = stopped(&mut shutdown) => break,
      }
    }

    self.set_state(ConnectionState::Disconnected);
  }

  /// Read frames until the connection closes or shutdown is requested.
  async fn pump(&self, mut stream: Box<dyn LiveStream>, shutdown: &mut watch::Receiver<bool>) {
    loop {
      tokio::select! {
        frame = stream.next_frame() => match frame {
          Some(Frame::Text(text)) => self.handle_message(&text),
          Some(Frame::Error(e)) => error!(error = %e, "Live update channel error"),
          None => return,
        },
        _ = stopped(shutdown) => {
          self.set_state(ConnectionState::Disconnecting);
          stream.close().await;
          return;
        }
      }
    }
  }

  /// Parse one inbound message; malformed payloads are logged and dropped.
  pub fn handle_message(&self, text: &str) {
    let payload: Value = match serde_json::from_str(text) {
      Ok(payload) => payload,
      Err(e) => {
        error!(error = %e, "Failed to parse live update message");
        return;
      }
    };

    self.cache.invalidate(DASHBOARD_CACHE_KEY);
    let delivered = self.bus.publish(UpdateEvent::dashboard_update(payload));
    debug!(delivered, "dashboard update published");
  }
}

/// Resolves once shutdown has been requested.
async fn stopped(shutdown: &mut watch::Receiver<bool>) {
  let _ = shutdown.wait_for(|stop| *stop).await;
}
