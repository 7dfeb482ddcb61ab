use bytes::Bytes;
use std::time::Duration;

use loadr_core::ScenarioConfig;

/// The progression the standard run works through: an unauthenticated health
/// check, ramping volumes against the task API, and a burst aimed squarely at
/// the target's rate limiter.
pub(crate) fn standard() -> Vec<ScenarioConfig> {
    vec![
        ScenarioConfig::new("health-check", "/health").load(25, 200),
        ScenarioConfig::new("tasks-moderate", "/api/tasks")
            .load(20, 150)
            .bearer_auth(),
        ScenarioConfig::new("tasks-high", "/api/tasks")
            .load(50, 300)
            .bearer_auth(),
        ScenarioConfig::new("rate-limit-burst", "/api/tasks")
            .load(100, 100)
            .bearer_auth(),
        ScenarioConfig::new("tasks-extreme", "/api/tasks")
            .load(100, 500)
            .bearer_auth(),
    ]
}

/// Deliberately hostile settings meant to force timeouts and connection loss.
pub(crate) fn extreme() -> Vec<ScenarioConfig> {
    vec![
        ScenarioConfig::new("multi-endpoint-blast", "/health")
            .endpoints(&["/health", "/api/tasks", "/api/users/profile"])
            .load(500, 2000)
            .deadline(Duration::from_millis(500))
            .bearer_auth(),
        ScenarioConfig::new("large-payload", "/api/tasks")
            .method(http::Method::POST)
            .payload(large_task_payload())
            .load(100, 100)
            .deadline(Duration::from_secs(2))
            .bearer_auth(),
    ]
}

/// ~65KiB task: oversized title/description plus a large tag array.
fn large_task_payload() -> Bytes {
    let payload = serde_json::json!({
        "title": "X".repeat(10_000),
        "description": "Y".repeat(50_000),
        "category": "stress_test",
        "tags": vec!["large"; 1_000],
    });
    Bytes::from(payload.to_string())
}
