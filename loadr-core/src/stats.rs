use hdrhistogram::Histogram;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use crate::outcome::{RequestOutcome, ResultKind};

#[derive(Debug)]
struct StatsInner {
    total: u64,
    success: u64,
    rate_limited: u64,
    application_failure: u64,
    timeout: u64,
    connection_failure: u64,
    latency_us: Histogram<u64>,
    errors_by_detail: HashMap<Arc<str>, u64>,
}

/// Thread-safe accumulator for one scenario run.
///
/// Everything lives behind a single lock so each `record` is atomic: a reader
/// can never observe a half-recorded outcome, and `total` always equals the
/// sum of the per-kind counters.
#[derive(Debug)]
pub struct ScenarioStats {
    inner: Mutex<StatsInner>,
}

impl Default for ScenarioStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioStats {
    #[must_use]
    pub fn new() -> Self {
        // Track up to 60s in microseconds (with 3 sigfigs).
        let latency_us = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3)
            .unwrap_or_else(|err| panic!("failed to init histogram: {err}"));

        Self {
            inner: Mutex::new(StatsInner {
                total: 0,
                success: 0,
                rate_limited: 0,
                application_failure: 0,
                timeout: 0,
                connection_failure: 0,
                latency_us,
                errors_by_detail: HashMap::new(),
            }),
        }
    }

    pub fn record(&self, outcome: &RequestOutcome) {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match outcome.kind {
            ResultKind::Success => inner.success += 1,
            ResultKind::RateLimited => inner.rate_limited += 1,
            ResultKind::ApplicationFailure { .. } => inner.application_failure += 1,
            ResultKind::Timeout => inner.timeout += 1,
            ResultKind::ConnectionFailure => inner.connection_failure += 1,
        }
        inner.total += 1;

        // Latency is measurable up to the point of classification for every
        // kind, so all outcomes contribute a sample.
        let us = outcome.latency.as_micros().min(u128::from(u64::MAX)) as u64;
        if us != 0 {
            let _ = inner.latency_us.record(us);
        }

        if let Some(key) = failure_key(outcome) {
            *inner.errors_by_detail.entry(key).or_insert(0) += 1;
        }
    }

    /// Consistent point-in-time copy. Records arriving after this call do not
    /// retroactively alter the returned snapshot.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        #[allow(clippy::len_zero)]
        let latency = if inner.latency_us.len() == 0 {
            LatencySummary::default()
        } else {
            let h = &inner.latency_us;
            LatencySummary {
                count: h.len(),
                mean: Duration::from_micros(h.mean().round() as u64),
                min: Duration::from_micros(h.min()),
                max: Duration::from_micros(h.max()),
                p50: Duration::from_micros(h.value_at_quantile(0.50)),
                p90: Duration::from_micros(h.value_at_quantile(0.90)),
                p99: Duration::from_micros(h.value_at_quantile(0.99)),
            }
        };

        let mut errors: Vec<(String, u64)> = inner
            .errors_by_detail
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        errors.sort_by(|(a_key, a_count), (b_key, b_count)| {
            b_count
                .cmp(a_count)
                .then_with(|| a_key.as_str().cmp(b_key.as_str()))
        });

        StatsSnapshot {
            total: inner.total,
            success: inner.success,
            rate_limited: inner.rate_limited,
            application_failure: inner.application_failure,
            timeout: inner.timeout,
            connection_failure: inner.connection_failure,
            latency,
            errors,
        }
    }
}

/// Normalized tally key for a non-success outcome.
fn failure_key(outcome: &RequestOutcome) -> Option<Arc<str>> {
    match outcome.kind {
        ResultKind::Success => None,
        ResultKind::RateLimited => Some(Arc::from("http_status:429")),
        ResultKind::ApplicationFailure {
            status: Some(code),
        } => Some(Arc::from(format!("http_status:{code}").as_str())),
        ResultKind::ApplicationFailure { status: None } => Some(match &outcome.detail {
            Some(detail) => Arc::from(format!("http_error:{detail}").as_str()),
            None => Arc::from("http_error:unclassified"),
        }),
        ResultKind::Timeout => Some(Arc::from("http_error:timeout")),
        ResultKind::ConnectionFailure => Some(match &outcome.detail {
            Some(detail) => Arc::from(format!("http_error:{detail}").as_str()),
            None => Arc::from("http_error:connect"),
        }),
    }
}

/// Latency digest over all recorded samples; all-zero when no samples exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencySummary {
    pub count: u64,
    pub mean: Duration,
    pub min: Duration,
    pub max: Duration,
    pub p50: Duration,
    pub p90: Duration,
    pub p99: Duration,
}

/// Frozen view of a scenario's aggregate statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSnapshot {
    pub total: u64,
    pub success: u64,
    pub rate_limited: u64,
    pub application_failure: u64,
    pub timeout: u64,
    pub connection_failure: u64,
    pub latency: LatencySummary,
    /// Failure tally keyed by normalized detail, most frequent first.
    pub errors: Vec<(String, u64)>,
}

impl StatsSnapshot {
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.success as f64) / (self.total as f64)
    }

    /// Requests that never produced a response: timeouts + failed connects.
    #[must_use]
    pub fn loss_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        ((self.timeout + self.connection_failure) as f64) / (self.total as f64)
    }

    /// Requests the target answered but rejected: 429s + application failures.
    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        ((self.rate_limited + self.application_failure) as f64) / (self.total as f64)
    }

    #[must_use]
    pub fn throughput(&self, elapsed: Duration) -> f64 {
        (self.total as f64) / elapsed.as_secs_f64().max(1e-9)
    }
}
