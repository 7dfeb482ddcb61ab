use std::time::Duration;

use crate::session::SessionError;

/// Closed classification of a request's terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ResultKind {
    Success,
    RateLimited,
    /// Any received status outside 200/201/429, or an error that is neither a
    /// deadline expiry nor a connection failure (then `status` is `None`).
    ApplicationFailure { status: Option<u16> },
    Timeout,
    ConnectionFailure,
}

/// One completed request attempt.
///
/// Created the instant a response or error is observed, recorded into the
/// aggregator exactly once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub kind: ResultKind,
    /// Time from submission to the point of classification. Measurable for
    /// every kind, including timeouts and failed connects.
    pub latency: Duration,
    pub detail: Option<String>,
}

/// Map a raw outcome to its result kind.
///
/// Pure and total: every `(status, error)` pair a session can produce has
/// exactly one kind.
#[must_use]
pub fn classify(status: Option<u16>, error: Option<&SessionError>) -> ResultKind {
    if let Some(err) = error {
        return match err {
            SessionError::Timeout(_) => ResultKind::Timeout,
            // Mid-stream transport failures (reset, truncated body) count as
            // connection failures, same as a failed connect. See DESIGN.md.
            SessionError::Connect(_) | SessionError::Transport(_) => ResultKind::ConnectionFailure,
            SessionError::Other(_) => ResultKind::ApplicationFailure { status: None },
        };
    }

    match status {
        Some(200 | 201) => ResultKind::Success,
        Some(429) => ResultKind::RateLimited,
        Some(code) => ResultKind::ApplicationFailure { status: Some(code) },
        // A session yields a status or an error; an empty pair is a session
        // bug we still fold into the generic bucket rather than panic mid-run.
        None => ResultKind::ApplicationFailure { status: None },
    }
}
