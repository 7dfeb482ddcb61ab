use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

use crate::session::{Session, SessionError, SessionRequest};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub identifier: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(identifier: &str, password: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            password: password.to_string(),
        }
    }
}

/// Capability to obtain a bearer token, called at most once per driver
/// session before any dispatch that needs it.
pub trait Authenticator: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = std::result::Result<Arc<str>, Self::Error>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("login request failed: {0}")]
    Request(#[from] SessionError),

    #[error("login rejected with status {0}")]
    Rejected(u16),

    #[error("login response had no data.token field")]
    MalformedResponse,
}

/// Logs in against the target's JSON auth endpoint and extracts the token
/// from `{"data": {"token": ...}}`.
#[derive(Debug, Clone)]
pub struct HttpAuthenticator<S> {
    session: Arc<S>,
    login_path: String,
    deadline: Duration,
}

impl<S> HttpAuthenticator<S> {
    pub const DEFAULT_LOGIN_PATH: &'static str = "/api/auth/login";

    #[must_use]
    pub fn new(session: Arc<S>) -> Self {
        Self {
            session,
            login_path: Self::DEFAULT_LOGIN_PATH.to_string(),
            deadline: Duration::from_secs(10),
        }
    }

    #[must_use]
    pub fn login_path(mut self, path: &str) -> Self {
        self.login_path = path.to_string();
        self
    }
}

impl<S: Session> Authenticator for HttpAuthenticator<S> {
    type Error = AuthError;

    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = std::result::Result<Arc<str>, AuthError>> + Send {
        let body = serde_json::json!({
            "identifier": credentials.identifier,
            "password": credentials.password,
        });
        let req = SessionRequest::post(
            &self.login_path,
            Bytes::from(body.to_string()),
            self.deadline,
        )
        .header("content-type", "application/json");
        let session = self.session.clone();

        async move {
            let res = session.send(req).await?;
            if res.status != 200 {
                return Err(AuthError::Rejected(res.status));
            }

            let parsed: serde_json::Value =
                serde_json::from_slice(&res.body).map_err(|_| AuthError::MalformedResponse)?;
            let token = parsed
                .pointer("/data/token")
                .and_then(|v| v.as_str())
                .ok_or(AuthError::MalformedResponse)?;

            Ok(Arc::from(token))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::session::SessionResponse;

    struct CannedSession {
        status: u16,
        body: &'static str,
    }

    impl Session for CannedSession {
        fn send(
            &self,
            req: SessionRequest,
        ) -> impl Future<Output = Result<SessionResponse, SessionError>> + Send {
            let status = self.status;
            let body = Bytes::from_static(self.body.as_bytes());
            async move {
                assert_eq!(req.method, http::Method::POST);
                Ok(SessionResponse { status, body })
            }
        }
    }

    #[tokio::test]
    async fn extracts_the_token_from_the_login_envelope() {
        let session = Arc::new(CannedSession {
            status: 200,
            body: r#"{"data":{"token":"abc-123"}}"#,
        });
        let auth = HttpAuthenticator::new(session);

        let token = auth
            .login(&Credentials::new("testuser", "123456"))
            .await
            .unwrap();
        assert_eq!(&*token, "abc-123");
    }

    #[tokio::test]
    async fn rejected_logins_carry_the_status() {
        let session = Arc::new(CannedSession {
            status: 401,
            body: r#"{"error":"invalid credentials"}"#,
        });
        let auth = HttpAuthenticator::new(session);

        let err = auth
            .login(&Credentials::new("testuser", "wrong"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Rejected(401)));
    }

    #[tokio::test]
    async fn malformed_envelopes_are_detected() {
        let session = Arc::new(CannedSession {
            status: 200,
            body: r#"{"data":{}}"#,
        });
        let auth = HttpAuthenticator::new(session);

        let err = auth
            .login(&Credentials::new("testuser", "123456"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MalformedResponse));
    }
}
