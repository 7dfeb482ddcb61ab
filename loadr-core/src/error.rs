pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("scenario requires authentication but no credentials were provided")]
    MissingCredentials,

    #[error("`concurrency` must be a positive integer")]
    InvalidConcurrency,

    #[error("`requests` must be a positive integer")]
    InvalidRequests,

    #[error("scenario needs at least one endpoint")]
    NoEndpoints,
}
