//! Error types shared by the cache, fetcher, facade and live channel.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Debug, Error)]
pub enum DashboardError {
  /// Network or connection failure before a response was received
  #[error("transport error for {url}: {message}")]
  Transport { url: String, message: String },

  /// The peer answered with a non-success status
  #[error("HTTP error! status: {status} ({url})")]
  HttpStatus { status: u16, url: String },

  /// Payload could not be decoded as the expected JSON shape
  #[error("malformed payload: {0}")]
  Parse(String),

  /// Every retry attempt failed; carries the last underlying error
  #[error("request failed after {attempts} attempt(s): {source}")]
  RequestExhausted {
    attempts: u32,
    #[source]
    source: Box<DashboardError>,
  },

  /// The local fallback data could not be read
  #[error("failed to read local data {path}: {source}")]
  LocalSource {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("configuration error: {0}")]
  Config(String),
}

impl DashboardError {
  /// The innermost error, unwrapping any `RequestExhausted` layers.
  pub fn root_cause(&self) -> &DashboardError {
    match self {
      Self::RequestExhausted { source, .. } => source.root_cause(),
      other => other,
    }
  }

  pub fn is_exhausted(&self) -> bool {
    matches!(self, Self::RequestExhausted { .. })
  }
}

impl From<serde_json::Error> for DashboardError {
  fn from(e: serde_json::Error) -> Self {
    Self::Parse(e.to_string())
  }
}
