//! Transport seam for the live update channel and its websocket implementation.

use async_trait::async_trait;
use futures::StreamExt;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::error::UrlError;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

/// One inbound event from an open connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
  /// A text payload, expected to be JSON
  Text(String),
  /// A transport-level error; the connection closes right after
  Error(String),
}

#[derive(Debug, Error)]
pub enum ConnectError {
  /// The runtime cannot provide this transport at all. Not retried.
  #[error("live transport unavailable: {0}")]
  Unsupported(String),
  /// Opening failed this time; treated like a close.
  #[error("failed to connect: {0}")]
  Failed(String),
}

/// An open push connection.
#[async_trait]
pub trait LiveStream: Send {
  /// Next frame, or `None` once the connection has closed.
  async fn next_frame(&mut self) -> Option<Frame>;

  async fn close(&mut self);
}

/// Opens push connections.
#[async_trait]
pub trait Connector: Send + Sync {
  async fn open(&self) -> Result<Box<dyn LiveStream>, ConnectError>;
}

/// Websocket connector (`ws://` or `wss://`).
pub struct WsConnector {
  url: String,
  enabled: bool,
}

impl WsConnector {
  pub fn new(url: &str, enabled: bool) -> Self {
    Self {
      url: url.to_string(),
      enabled,
    }
  }

  fn validated_url(&self) -> Result<Url, ConnectError> {
    if !self.enabled {
      return Err(ConnectError::Unsupported("live updates disabled".to_string()));
    }

    let url = Url::parse(&self.url)
      .map_err(|e| ConnectError::Unsupported(format!("invalid url {}: {}", self.url, e)))?;

    match url.scheme() {
      "ws" | "wss" => Ok(url),
      other => Err(ConnectError::Unsupported(format!(
        "scheme {} is not a websocket scheme",
        other
      ))),
    }
  }
}

#[async_trait]
impl Connector for WsConnector {
  async fn open(&self) -> Result<Box<dyn LiveStream>, ConnectError> {
    let url = self.validated_url()?;

    let (stream, _) = connect_async(url.as_str()).await.map_err(classify)?;

    Ok(Box::new(WsStream {
      inner: stream,
      closed: false,
    }))
  }
}

/// Build-time gaps are permanent; everything else may succeed next time.
fn classify(e: WsError) -> ConnectError {
  match e {
    WsError::Url(UrlError::TlsFeatureNotEnabled) => {
      ConnectError::Unsupported("TLS support not compiled in".to_string())
    }
    other => ConnectError::Failed(other.to_string()),
  }
}

struct WsStream {
  inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
  closed: bool,
}

#[async_trait]
impl LiveStream for WsStream {
  async fn next_frame(&mut self) -> Option<Frame> {
    if self.closed {
      return None;
    }

    loop {
      match self.inner.next().await {
        Some(Ok(Message::Text(text))) => return Some(Frame::Text(text)),
        Some(Ok(Message::Binary(bytes))) => {
          return Some(Frame::Text(String::from_utf8_lossy(&bytes).into_owned()))
        }
        Some(Ok(Message::Close(_))) | None => {
          self.closed = true;
          return None;
        }
        Some(Ok(_)) => {
          // Ping/pong are answered by tungstenite
        }
        Some(Err(e)) => {
          self.closed = true;
          return Some(Frame::Error(e.to_string()));
        }
      }
    }
  }

  async fn close(&mut self) {
    if !self.closed {
      if let Err(e) = self.inner.close(None).await {
        debug!(error = %e, "websocket close failed");
      }
      self.closed = true;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_disabled_connector_is_unsupported() {
    let connector = WsConnector::new("ws://localhost:8080/dashboard", false);
    let err = connector.open().await.err().unwrap();
    assert!(matches!(err, ConnectError::Unsupported(_)));
  }

  #[tokio::test]
  async fn test_non_websocket_scheme_is_unsupported() {
    let connector = WsConnector::new("http://localhost:8080/dashboard", true);
    let err = connector.open().await.err().unwrap();
    assert!(matches!(err, ConnectError::Unsupported(_)));
  }

  #[test]
  fn test_missing_tls_support_is_unsupported() {
    let err = classify(WsError::Url(UrlError::TlsFeatureNotEnabled));
    assert!(matches!(err, ConnectError::Unsupported(_)));

    let err = classify(WsError::ConnectionClosed);
    assert!(matches!(err, ConnectError::Failed(_)));
  }

  #[tokio::test]
  async fn test_wss_reaches_tls_handshake() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
      // Accept and hang up so the handshake fails
      if let Ok((socket, _)) = listener.accept().await {
        drop(socket);
      }
    });

    let connector = WsConnector::new(&format!("wss://127.0.0.1:{}/dashboard", port), true);
    let err = connector.open().await.err().unwrap();

    match err {
      ConnectError::Failed(message) => {
        assert!(!message.contains("TLS support not compiled in"), "{}", message)
      }
      other => panic!("expected a transient failure, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_close_after_peer_hangup_marks_stream_closed() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
      let (socket, _) = listener.accept().await.unwrap();
      let ws = tokio_tungstenite::accept_async(socket).await.unwrap();
      drop(ws);
    });

    let connector = WsConnector::new(&format!("ws://127.0.0.1:{}/dashboard", port), true);
    let mut stream = connector.open().await.unwrap();
    server.await.unwrap();

    // The peer is gone, so the close handshake fails and is only logged
    stream.close().await;
    assert_eq!(stream.next_frame().await, None);
  }

  #[test]
  fn test_websocket_url_accepted() {
    let connector = WsConnector::new("wss://dash.example.com/dashboard", true);
    assert_eq!(connector.validated_url().unwrap().scheme(), "wss");
  }
}
