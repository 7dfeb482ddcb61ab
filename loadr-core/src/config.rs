use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};

/// Whether a scenario sends the session's bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum AuthMode {
    /// Run without an Authorization header (e.g. health checks).
    None,
    /// Attach the bearer token; the scenario completes empty if login failed.
    Bearer,
}

/// Immutable description of one load scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    pub name: String,
    /// Target endpoint paths, assigned to tasks round-robin by index.
    pub endpoints: Vec<Arc<str>>,
    pub method: http::Method,
    /// Admission width K: at most this many requests in flight at once.
    pub concurrency: usize,
    /// Total logical requests N to issue.
    pub requests: u64,
    /// Per-request deadline over the whole exchange.
    pub deadline: Duration,
    pub payload: Option<Bytes>,
    pub auth: AuthMode,
}

impl ScenarioConfig {
    #[must_use]
    pub fn new(name: &str, endpoint: &str) -> Self {
        Self {
            name: name.to_string(),
            endpoints: vec![Arc::from(endpoint)],
            method: http::Method::GET,
            concurrency: 1,
            requests: 1,
            deadline: Duration::from_secs(5),
            payload: None,
            auth: AuthMode::None,
        }
    }

    /// Replace the endpoint list; tasks round-robin over it.
    #[must_use]
    pub fn endpoints(mut self, endpoints: &[&str]) -> Self {
        self.endpoints = endpoints.iter().map(|e| Arc::from(*e)).collect();
        self
    }

    #[must_use]
    pub fn method(mut self, method: http::Method) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn load(mut self, concurrency: usize, requests: u64) -> Self {
        self.concurrency = concurrency;
        self.requests = requests;
        self
    }

    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    #[must_use]
    pub fn payload(mut self, payload: Bytes) -> Self {
        self.payload = Some(payload);
        self
    }

    #[must_use]
    pub fn bearer_auth(mut self) -> Self {
        self.auth = AuthMode::Bearer;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::InvalidConcurrency);
        }
        if self.requests == 0 {
            return Err(Error::InvalidRequests);
        }
        if self.endpoints.is_empty() {
            return Err(Error::NoEndpoints);
        }
        Ok(())
    }

    pub(crate) fn endpoint_for(&self, index: u64) -> Arc<str> {
        let i = (index as usize) % self.endpoints.len();
        self.endpoints[i].clone()
    }
}
