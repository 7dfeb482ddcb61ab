use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::sleep;

pub const PATH_HEALTH: &str = "/health";
pub const PATH_LOGIN: &str = "/api/auth/login";
pub const PATH_TASKS: &str = "/api/tasks";
pub const PATH_PROFILE: &str = "/api/users/profile";
pub const PATH_SLOW: &str = "/slow";

pub const TEST_IDENTIFIER: &str = "testuser";
pub const TEST_PASSWORD: &str = "123456";
pub const TEST_TOKEN: &str = "test-token-0001";

/// Counters the target keeps about the traffic it actually saw, so tests can
/// assert on server-side observations (e.g. the admission bound).
#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    rate_limited_total: Arc<AtomicU64>,
    unauthorized_total: Arc<AtomicU64>,
    in_flight: Arc<AtomicU64>,
    max_in_flight: Arc<AtomicU64>,
}

impl TestServerStats {
    fn enter(&self) -> InFlightGuard {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlightGuard {
            in_flight: self.in_flight.clone(),
        }
    }

    fn inc_rate_limited(&self) {
        self.rate_limited_total.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_unauthorized(&self) {
        self.unauthorized_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn rate_limited_total(&self) -> u64 {
        self.rate_limited_total.load(Ordering::Relaxed)
    }

    pub fn unauthorized_total(&self) -> u64 {
        self.unauthorized_total.load(Ordering::Relaxed)
    }

    /// Highest number of requests observed concurrently inside handlers.
    pub fn observed_max_in_flight(&self) -> u64 {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlightGuard {
    in_flight: Arc<AtomicU64>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fixed-window throttle applied to the `/api/*` data endpoints.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub max_requests: u64,
    pub window: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct TestServerOptions {
    /// 429 once more than `max_requests` land inside a window; `None`
    /// disables throttling.
    pub rate_limit: Option<RateLimit>,
    /// Artificial latency added to every data response.
    pub response_delay: Duration,
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u64,
}

#[derive(Clone)]
struct AppState {
    stats: TestServerStats,
    options: Arc<TestServerOptions>,
    window: Arc<Mutex<Window>>,
}

impl AppState {
    /// Returns true when this request should be throttled.
    fn over_limit(&self) -> bool {
        let Some(limit) = self.options.rate_limit else {
            return false;
        };

        let mut window = self
            .window
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if window.started.elapsed() > limit.window {
            window.started = Instant::now();
            window.count = 0;
        }
        window.count += 1;
        window.count > limit.max_requests
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {TEST_TOKEN}"))
    }
}

pub struct TestServer {
    addr: SocketAddr,
    stats: TestServerStats,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(TestServerOptions::default()).await
    }

    pub async fn start_with(options: TestServerOptions) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();
        let state = AppState {
            stats: stats.clone(),
            options: Arc::new(options),
            window: Arc::new(Mutex::new(Window {
                started: Instant::now(),
                count: 0,
            })),
        };

        let app = Router::new()
            .route(PATH_HEALTH, get(handle_health))
            .route(PATH_LOGIN, post(handle_login))
            .route(PATH_TASKS, get(handle_tasks).post(handle_create_task))
            .route(PATH_PROFILE, get(handle_profile))
            .route(PATH_SLOW, get(handle_slow))
            .with_state(state);

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await;
        });

        Ok(Self {
            addr,
            stats,
            shutdown: Some(tx),
            handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

async fn handle_health(State(state): State<AppState>) -> (StatusCode, &'static str) {
    let _guard = state.stats.enter();
    (StatusCode::OK, "ok")
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    identifier: String,
    password: String,
}

async fn handle_login(State(state): State<AppState>, body: Bytes) -> (StatusCode, String) {
    let _guard = state.stats.enter();

    let Ok(req) = serde_json::from_slice::<LoginRequest>(&body) else {
        return (
            StatusCode::BAD_REQUEST,
            r#"{"error":"bad json"}"#.to_string(),
        );
    };

    if req.identifier == TEST_IDENTIFIER && req.password == TEST_PASSWORD {
        (
            StatusCode::OK,
            format!(r#"{{"data":{{"token":"{TEST_TOKEN}"}}}}"#),
        )
    } else {
        state.stats.inc_unauthorized();
        (
            StatusCode::UNAUTHORIZED,
            r#"{"error":"invalid credentials"}"#.to_string(),
        )
    }
}

/// Shared entry path for the protected, throttled data endpoints. Returns the
/// early response when the request cannot proceed.
async fn gatekeep(state: &AppState, headers: &HeaderMap) -> Option<(StatusCode, String)> {
    if !state.authorized(headers) {
        state.stats.inc_unauthorized();
        return Some((
            StatusCode::UNAUTHORIZED,
            r#"{"error":"missing or invalid token"}"#.to_string(),
        ));
    }

    if state.over_limit() {
        state.stats.inc_rate_limited();
        return Some((
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":"rate limit exceeded"}"#.to_string(),
        ));
    }

    if !state.options.response_delay.is_zero() {
        sleep(state.options.response_delay).await;
    }

    None
}

async fn handle_tasks(State(state): State<AppState>, headers: HeaderMap) -> (StatusCode, String) {
    let _guard = state.stats.enter();

    if let Some(early) = gatekeep(&state, &headers).await {
        return early;
    }

    (
        StatusCode::OK,
        r#"{"data":[{"id":1,"title":"first task"},{"id":2,"title":"second task"}]}"#.to_string(),
    )
}

async fn handle_create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let _guard = state.stats.enter();

    if let Some(early) = gatekeep(&state, &headers).await {
        return early;
    }

    (
        StatusCode::CREATED,
        format!(r#"{{"data":{{"id":3,"bytes":{}}}}}"#, body.len()),
    )
}

async fn handle_profile(State(state): State<AppState>, headers: HeaderMap) -> (StatusCode, String) {
    let _guard = state.stats.enter();

    if let Some(early) = gatekeep(&state, &headers).await {
        return early;
    }

    (
        StatusCode::OK,
        format!(r#"{{"data":{{"identifier":"{TEST_IDENTIFIER}"}}}}"#),
    )
}

#[derive(Debug, Deserialize)]
struct SlowParams {
    #[serde(default)]
    ms: u64,
}

async fn handle_slow(
    State(state): State<AppState>,
    Query(params): Query<SlowParams>,
) -> (StatusCode, &'static str) {
    let _guard = state.stats.enter();
    sleep(Duration::from_millis(params.ms)).await;
    (StatusCode::OK, "slow ok")
}
