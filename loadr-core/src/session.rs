use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

use loadr_http::{HttpClient, HttpRequest};

/// One logical exchange against the target, addressed by endpoint path.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub method: http::Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub deadline: Duration,
}

impl SessionRequest {
    #[must_use]
    pub fn new(method: http::Method, path: &str, deadline: Duration) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
            body: Bytes::new(),
            deadline,
        }
    }

    #[must_use]
    pub fn get(path: &str, deadline: Duration) -> Self {
        Self::new(http::Method::GET, path, deadline)
    }

    #[must_use]
    pub fn post(path: &str, body: Bytes, deadline: Duration) -> Self {
        let mut req = Self::new(http::Method::POST, path, deadline);
        req.body = body;
        req
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }
}

/// Status and fully-consumed body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResponse {
    pub status: u16,
    pub body: Bytes,
}

/// The failure taxonomy a session can produce, as seen by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("request deadline of {0:?} expired")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("transport failed after connect: {0}")]
    Transport(String),

    #[error("{0}")]
    Other(String),
}

/// Capability to issue one HTTP exchange.
///
/// Implementations must fully consume the response body before resolving, so
/// pooled connections stay reusable, and must enforce `req.deadline` by
/// cancelling in-flight I/O on expiry.
pub trait Session: Send + Sync + 'static {
    fn send(
        &self,
        req: SessionRequest,
    ) -> impl Future<Output = std::result::Result<SessionResponse, SessionError>> + Send;
}

/// Real session over `loadr-http`, resolving endpoint paths against a base URL.
///
/// The underlying client pools connections; sharing one session across all
/// executors of a scenario keeps socket creation bounded by the gate width.
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: HttpClient,
    base_url: Arc<str>,
}

impl HttpSession {
    #[must_use]
    pub fn new(client: HttpClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        }
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        format!("{}{}", self.base_url, path)
    }
}

impl Session for HttpSession {
    fn send(
        &self,
        req: SessionRequest,
    ) -> impl Future<Output = std::result::Result<SessionResponse, SessionError>> + Send {
        let request = HttpRequest {
            method: req.method,
            url: self.url_for(&req.path),
            headers: req.headers,
            body: req.body,
            deadline: Some(req.deadline),
        };
        let client = self.client.clone();

        async move {
            match client.request(request).await {
                Ok(res) => Ok(SessionResponse {
                    status: res.status,
                    body: res.body,
                }),
                Err(err) => Err(SessionError::from(err)),
            }
        }
    }
}

impl From<loadr_http::Error> for SessionError {
    fn from(err: loadr_http::Error) -> Self {
        match err {
            loadr_http::Error::Timeout(limit) => Self::Timeout(limit),
            loadr_http::Error::Connect(detail) => Self::Connect(detail),
            loadr_http::Error::Transport(detail) | loadr_http::Error::BodyRead(detail) => {
                Self::Transport(detail)
            }
            other => Self::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_against_base_url() {
        let session = HttpSession::new(HttpClient::new(None), "http://localhost:3000/");
        assert_eq!(
            session.url_for("/api/tasks"),
            "http://localhost:3000/api/tasks"
        );
        assert_eq!(
            session.url_for("http://other:1234/x"),
            "http://other:1234/x"
        );
    }

    #[test]
    fn http_errors_map_onto_the_session_taxonomy() {
        let err = loadr_http::Error::Timeout(Duration::from_millis(500));
        assert_eq!(
            SessionError::from(err),
            SessionError::Timeout(Duration::from_millis(500))
        );

        let err = loadr_http::Error::Connect("refused".into());
        assert_eq!(SessionError::from(err), SessionError::Connect("refused".into()));

        let err = loadr_http::Error::BodyRead("reset".into());
        assert_eq!(SessionError::from(err), SessionError::Transport("reset".into()));

        let err = loadr_http::Error::InvalidUrl("::".into());
        assert!(matches!(SessionError::from(err), SessionError::Other(_)));
    }
}
