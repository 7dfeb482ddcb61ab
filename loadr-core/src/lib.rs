mod auth;
mod config;
mod dispatcher;
mod driver;
mod error;
mod executor;
mod outcome;
mod progress;
mod session;
mod stats;

pub use auth::{AuthError, Authenticator, Credentials, HttpAuthenticator};
pub use config::{AuthMode, ScenarioConfig};
pub use dispatcher::dispatch;
pub use driver::{Reporter, ScenarioDriver, ScenarioReport};
pub use error::{Error, Result};
pub use executor::RequestExecutor;
pub use outcome::{RequestOutcome, ResultKind, classify};
pub use progress::{ProgressFn, ProgressUpdate};
pub use session::{HttpSession, Session, SessionError, SessionRequest, SessionResponse};
pub use stats::{LatencySummary, ScenarioStats, StatsSnapshot};
