use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::ScenarioConfig;
use crate::outcome::{RequestOutcome, ResultKind, classify};
use crate::session::{Session, SessionRequest};
use crate::stats::ScenarioStats;

/// Performs one HTTP call per invocation and records exactly one outcome.
#[derive(Debug)]
pub struct RequestExecutor<S> {
    session: Arc<S>,
    stats: Arc<ScenarioStats>,
    method: http::Method,
    payload: Option<Bytes>,
    deadline: Duration,
    token: Option<Arc<str>>,
}

impl<S: Session> RequestExecutor<S> {
    #[must_use]
    pub fn new(
        session: Arc<S>,
        stats: Arc<ScenarioStats>,
        config: &ScenarioConfig,
        token: Option<Arc<str>>,
    ) -> Self {
        Self {
            session,
            stats,
            method: config.method.clone(),
            payload: config.payload.clone(),
            deadline: config.deadline,
            token,
        }
    }

    /// Issue one attempt against `endpoint`. Never fails: every response and
    /// every error becomes a classified, recorded outcome.
    pub async fn execute(&self, endpoint: &str) -> RequestOutcome {
        let mut req = SessionRequest::new(self.method.clone(), endpoint, self.deadline);
        if let Some(token) = &self.token {
            req = req.header("authorization", &format!("Bearer {token}"));
        }
        if let Some(payload) = &self.payload {
            req = req
                .header("content-type", "application/json")
                .body(payload.clone());
        }

        let started = Instant::now();
        let result = self.session.send(req).await;
        let latency = started.elapsed();

        let outcome = match result {
            Ok(res) => {
                let kind = classify(Some(res.status), None);
                let detail = match kind {
                    ResultKind::Success => None,
                    _ => Some(format!("status {}", res.status)),
                };
                RequestOutcome {
                    kind,
                    latency,
                    detail,
                }
            }
            Err(err) => RequestOutcome {
                kind: classify(None, Some(&err)),
                latency,
                detail: Some(err.to_string()),
            },
        };

        self.stats.record(&outcome);
        outcome
    }
}
