//! Scripted transport for unit tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use super::transport::{FetchRequest, Transport};
use crate::error::{DashboardError, Result};

/// Replays queued responses per URL; an empty queue answers 404.
#[derive(Default)]
pub struct FakeTransport {
  responses: Mutex<HashMap<String, VecDeque<Result<Value>>>>,
  requests: Mutex<Vec<FetchRequest>>,
}

impl FakeTransport {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn respond(&self, url: &str, response: Result<Value>) {
    self
      .responses
      .lock()
      .unwrap()
      .entry(url.to_string())
      .or_default()
      .push_back(response);
  }

  pub fn fail(&self, url: &str, status: u16, times: usize) {
    for _ in 0..times {
      self.respond(
        url,
        Err(DashboardError::HttpStatus {
          status,
          url: url.to_string(),
        }),
      );
    }
  }

  pub fn requests(&self) -> Vec<FetchRequest> {
    self.requests.lock().unwrap().clone()
  }

  pub fn calls_to(&self, url: &str) -> usize {
    self
      .requests
      .lock()
      .unwrap()
      .iter()
      .filter(|r| r.url == url)
      .count()
  }
}

#[async_trait]
impl Transport for FakeTransport {
  async fn send(&self, request: &FetchRequest) -> Result<Value> {
    self.requests.lock().unwrap().push(request.clone());

    let next = self
      .responses
      .lock()
      .unwrap()
      .get_mut(&request.url)
      .and_then(|queue| queue.pop_front());

    next.unwrap_or_else(|| {
      Err(DashboardError::HttpStatus {
        status: 404,
        url: request.url.clone(),
      })
    })
  }
}
