//! Request description and the HTTP transport that executes it.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::error::{DashboardError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
}

/// A single JSON request. Immutable once built.
#[derive(Debug, Clone)]
pub struct FetchRequest {
  pub url: String,
  pub method: Method,
  pub body: Option<Value>,
  pub headers: Vec<(String, String)>,
}

impl FetchRequest {
  pub fn get(url: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      method: Method::Get,
      body: None,
      headers: Vec::new(),
    }
  }

  pub fn post(url: impl Into<String>, body: Value) -> Self {
    Self {
      url: url.into(),
      method: Method::Post,
      body: Some(body),
      headers: Vec::new(),
    }
  }

  pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.push((name.into(), value.into()));
    self
  }

  /// Headers to send: JSON content type first, caller headers override it.
  pub fn effective_headers(&self) -> Vec<(String, String)> {
    let overrides_content_type = self
      .headers
      .iter()
      .any(|(name, _)| name.eq_ignore_ascii_case("content-type"));

    let mut headers = Vec::with_capacity(self.headers.len() + 1);
    if !overrides_content_type {
      headers.push(("Content-Type".to_string(), "application/json".to_string()));
    }
    headers.extend(self.headers.iter().cloned());
    headers
  }
}

/// Executes one request attempt and decodes the JSON response.
///
/// Implementations map failures onto `Transport`, `HttpStatus` and `Parse`;
/// retrying is the caller's concern.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: &FetchRequest) -> Result<Value>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
}

impl HttpTransport {
  pub fn new(request_timeout: Duration) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(request_timeout)
      .build()
      .map_err(|e| DashboardError::Config(format!("Failed to build HTTP client: {}", e)))?;

    Ok(Self { client })
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn send(&self, request: &FetchRequest) -> Result<Value> {
    let mut builder = match request.method {
      Method::Get => self.client.get(&request.url),
      Method::Post => self.client.post(&request.url),
    };

    for (name, value) in request.effective_headers() {
      builder = builder.header(name, value);
    }

    if let Some(body) = &request.body {
      builder = builder.body(serde_json::to_vec(body)?);
    }

    let transport_err = |e: reqwest::Error| DashboardError::Transport {
      url: request.url.clone(),
      message: e.to_string(),
    };

    let response = builder.send().await.map_err(transport_err)?;

    let status = response.status();
    if !status.is_success() {
      return Err(DashboardError::HttpStatus {
        status: status.as_u16(),
        url: request.url.clone(),
      });
    }

    let bytes = response.bytes().await.map_err(transport_err)?;
    Ok(serde_json::from_slice(&bytes)?)
  }
}
