use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use super::transport::{FetchRequest, Transport};
use crate::error::{DashboardError, Result};
use crate::retry::{with_retry, RetryPolicy};

/// Where the static snapshot comes from when the remote service is down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackSource {
  /// A JSON file on disk
  File(PathBuf),
  /// A URL fetched once through the regular transport
  Url(String),
}

/// Remote dashboard service client.
///
/// Every remote call goes through the retry policy; the local fallback is
/// read exactly once with no retry.
#[derive(Clone)]
pub struct DashboardClient {
  transport: Arc<dyn Transport>,
  base_url: String,
  retry: RetryPolicy,
  fallback: FallbackSource,
}

impl DashboardClient {
  pub fn new(
    transport: Arc<dyn Transport>,
    base_url: &str,
    retry: RetryPolicy,
    fallback: FallbackSource,
  ) -> Self {
    Self {
      transport,
      base_url: base_url.trim_end_matches('/').to_string(),
      retry,
      fallback,
    }
  }

  pub fn endpoint(&self, path: &str) -> String {
    format!("{}/{}", self.base_url, path.trim_start_matches('/'))
  }

  /// Send a request with the configured retry policy.
  pub async fn fetch_with_retry(&self, request: FetchRequest) -> Result<Value> {
    with_retry(&self.retry, |attempt| {
      let transport = Arc::clone(&self.transport);
      let request = request.clone();
      async move {
        debug!(url = %request.url, attempt, "sending request");
        transport.send(&request).await
      }
    })
    .await
  }

  /// `GET {base}/dashboard`
  pub async fn get_dashboard(&self) -> Result<Value> {
    self
      .fetch_with_retry(FetchRequest::get(self.endpoint("dashboard")))
      .await
  }

  /// `GET {base}/notifications`, which must return a JSON array
  pub async fn get_notifications(&self) -> Result<Vec<Value>> {
    let data = self
      .fetch_with_retry(FetchRequest::get(self.endpoint("notifications")))
      .await?;

    match data {
      Value::Array(items) => Ok(items),
      other => Err(DashboardError::Parse(format!(
        "expected a notification list, got {}",
        json_kind(&other)
      ))),
    }
  }

  /// `POST {base}/metrics`, returning the server acknowledgement
  pub async fn post_metrics(&self, metrics: &Value) -> Result<Value> {
    self
      .fetch_with_retry(FetchRequest::post(self.endpoint("metrics"), metrics.clone()))
      .await
  }

  /// Read the static snapshot. Failures propagate.
  pub async fn read_local_data(&self) -> Result<Value> {
    match &self.fallback {
      FallbackSource::File(path) => {
        let bytes = tokio::fs::read(path)
          .await
          .map_err(|source| DashboardError::LocalSource {
            path: path.display().to_string(),
            source,
          })?;
        Ok(serde_json::from_slice(&bytes)?)
      }
      FallbackSource::Url(url) => self.transport.send(&FetchRequest::get(url.clone())).await,
    }
  }
}

fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}
