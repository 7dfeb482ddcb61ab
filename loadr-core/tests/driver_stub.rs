//! Driver-level behavior against instrumented stub sessions: outcome counts,
//! the concurrency bound, scenario isolation, and the login lifecycle.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use loadr_core::{
    Authenticator, Credentials, Reporter, ScenarioConfig, ScenarioDriver, ScenarioReport, Session,
    SessionError, SessionRequest, SessionResponse,
};

#[derive(Debug, Clone, Copy)]
enum Behavior {
    /// Respond with this status after the given delay.
    Respond { status: u16, delay: Duration },
    /// Sleep out the request's own deadline, then fail as a timeout.
    TimeOut,
}

struct StubSession {
    behavior: Behavior,
    in_flight: AtomicU64,
    max_in_flight: AtomicU64,
    calls: AtomicU64,
}

impl StubSession {
    fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            in_flight: AtomicU64::new(0),
            max_in_flight: AtomicU64::new(0),
            calls: AtomicU64::new(0),
        })
    }
}

impl Session for StubSession {
    fn send(
        &self,
        req: SessionRequest,
    ) -> impl Future<Output = Result<SessionResponse, SessionError>> + Send {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let result = match self.behavior {
                Behavior::Respond { status, delay } => {
                    tokio::time::sleep(delay).await;
                    Ok(SessionResponse {
                        status,
                        body: Bytes::new(),
                    })
                }
                Behavior::TimeOut => {
                    tokio::time::sleep(req.deadline).await;
                    Err(SessionError::Timeout(req.deadline))
                }
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("login unavailable")]
struct LoginUnavailable;

struct StubAuth {
    succeed: bool,
    calls: AtomicU64,
}

impl StubAuth {
    fn ok() -> Self {
        Self {
            succeed: true,
            calls: AtomicU64::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            succeed: false,
            calls: AtomicU64::new(0),
        }
    }
}

impl Authenticator for &StubAuth {
    type Error = LoginUnavailable;

    fn login(
        &self,
        _credentials: &Credentials,
    ) -> impl Future<Output = Result<Arc<str>, LoginUnavailable>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let succeed = self.succeed;
        async move {
            if succeed {
                Ok(Arc::from("stub-token"))
            } else {
                Err(LoginUnavailable)
            }
        }
    }
}

struct NullReporter;

impl Reporter for NullReporter {
    fn report(&mut self, _report: &ScenarioReport) {}
}

fn credentials() -> Option<Credentials> {
    Some(Credentials::new("testuser", "123456"))
}

#[tokio::test]
async fn all_success_run_is_bounded_by_concurrency() {
    let session = StubSession::new(Behavior::Respond {
        status: 200,
        delay: Duration::from_millis(10),
    });
    let auth = StubAuth::ok();
    let mut driver = ScenarioDriver::new(session.clone(), &auth, credentials());

    let config = ScenarioConfig::new("all-success", "/health").load(10, 100);
    let report = driver.run_scenario(&config).await.unwrap();

    assert_eq!(report.stats.total, 100);
    assert_eq!(report.stats.success, 100);
    assert_eq!(report.stats.rate_limited, 0);
    assert_eq!(report.stats.application_failure, 0);
    assert_eq!(report.stats.timeout, 0);
    assert_eq!(report.stats.connection_failure, 0);
    assert!((report.stats.success_rate() - 1.0).abs() < 1e-9);

    assert!(report.stats.latency.mean >= Duration::from_millis(9));
    assert!(report.stats.latency.mean < Duration::from_millis(100));

    // 100 requests of 10ms at width 10 is ~100ms; serial would be 1s.
    assert!(
        report.elapsed < Duration::from_millis(900),
        "elapsed {:?} suggests serial execution",
        report.elapsed
    );

    assert!(session.max_in_flight.load(Ordering::SeqCst) <= 10);
    assert_eq!(session.calls.load(Ordering::SeqCst), 100);
}

#[tokio::test]
async fn all_timeout_run_records_every_expiry() {
    let session = StubSession::new(Behavior::TimeOut);
    let auth = StubAuth::ok();
    let mut driver = ScenarioDriver::new(session.clone(), &auth, credentials());

    let config = ScenarioConfig::new("all-timeout", "/api/tasks")
        .load(5, 20)
        .deadline(Duration::from_millis(50));
    let report = driver.run_scenario(&config).await.unwrap();

    assert_eq!(report.stats.total, 20);
    assert_eq!(report.stats.timeout, 20);
    assert_eq!(report.stats.success, 0);
    assert!((report.stats.loss_rate() - 1.0).abs() < 1e-9);

    // 20 deadline-bound requests at width 5 need at least 4 full deadlines.
    assert!(
        report.elapsed >= Duration::from_millis(200),
        "elapsed {:?} finished before the deadlines could expire",
        report.elapsed
    );
    assert!(session.max_in_flight.load(Ordering::SeqCst) <= 5);
}

#[tokio::test]
async fn all_rate_limited_run_is_not_loss() {
    let session = StubSession::new(Behavior::Respond {
        status: 429,
        delay: Duration::from_millis(1),
    });
    let auth = StubAuth::ok();
    let mut driver = ScenarioDriver::new(session, &auth, credentials());

    let config = ScenarioConfig::new("burst", "/api/tasks").load(50, 100);
    let report = driver.run_scenario(&config).await.unwrap();

    assert_eq!(report.stats.total, 100);
    assert_eq!(report.stats.rate_limited, 100);
    assert_eq!(report.stats.success, 0);
    assert_eq!(report.stats.loss_rate(), 0.0);
    assert_eq!(report.stats.success_rate(), 0.0);
    assert!((report.stats.failure_rate() - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn sequential_scenarios_are_isolated() {
    let auth = StubAuth::ok();

    let ok_session = StubSession::new(Behavior::Respond {
        status: 200,
        delay: Duration::from_millis(1),
    });
    let mut driver = ScenarioDriver::new(ok_session, &auth, credentials());
    let first = ScenarioConfig::new("first", "/health").load(10, 30);
    let second = ScenarioConfig::new("second", "/health").load(10, 20);

    let mut reporter = NullReporter;
    let reports = driver
        .run_all(&[first, second], &mut reporter)
        .await
        .unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].stats.total, 30);
    // Nothing from the first scenario leaks into the second snapshot.
    assert_eq!(reports[1].stats.total, 20);
}

#[tokio::test]
async fn login_happens_once_across_authenticated_scenarios() {
    let session = StubSession::new(Behavior::Respond {
        status: 200,
        delay: Duration::from_millis(1),
    });
    let auth = StubAuth::ok();
    let mut driver = ScenarioDriver::new(session, &auth, credentials());

    let a = ScenarioConfig::new("a", "/api/tasks").load(5, 10).bearer_auth();
    let b = ScenarioConfig::new("b", "/api/tasks").load(5, 10).bearer_auth();

    let mut reporter = NullReporter;
    driver.run_all(&[a, b], &mut reporter).await.unwrap();

    assert_eq!(auth.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_login_yields_a_zero_activity_report_and_the_run_continues() {
    let session = StubSession::new(Behavior::Respond {
        status: 200,
        delay: Duration::from_millis(1),
    });
    let auth = StubAuth::failing();
    let mut driver = ScenarioDriver::new(session.clone(), &auth, credentials());

    let protected = ScenarioConfig::new("protected", "/api/tasks")
        .load(5, 10)
        .bearer_auth();
    let open = ScenarioConfig::new("open", "/health").load(5, 10);
    let protected_again = ScenarioConfig::new("protected-again", "/api/tasks")
        .load(5, 10)
        .bearer_auth();

    let mut reporter = NullReporter;
    let reports = driver
        .run_all(&[protected, open, protected_again], &mut reporter)
        .await
        .unwrap();

    assert!(reports[0].warning.is_some());
    assert_eq!(reports[0].stats.total, 0);
    assert_eq!(reports[0].stats.success_rate(), 0.0);

    // The unauthenticated scenario still ran.
    assert!(reports[1].warning.is_none());
    assert_eq!(reports[1].stats.total, 10);

    // The failed login is remembered, not retried.
    assert!(reports[2].warning.is_some());
    assert_eq!(reports[2].stats.total, 0);
    assert_eq!(auth.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_credentials_skip_the_scenario_with_a_warning() {
    let session = StubSession::new(Behavior::Respond {
        status: 200,
        delay: Duration::from_millis(1),
    });
    let auth = StubAuth::ok();
    let mut driver = ScenarioDriver::new(session, &auth, None);

    let config = ScenarioConfig::new("protected", "/api/tasks")
        .load(5, 10)
        .bearer_auth();
    let report = driver.run_scenario(&config).await.unwrap();

    assert!(report.warning.is_some());
    assert_eq!(report.stats.total, 0);
    assert_eq!(auth.calls.load(Ordering::SeqCst), 0);
}
