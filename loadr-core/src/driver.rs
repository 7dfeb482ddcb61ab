use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;

use crate::auth::{Authenticator, Credentials};
use crate::config::{AuthMode, ScenarioConfig};
use crate::dispatcher::dispatch;
use crate::error::{Error, Result};
use crate::executor::RequestExecutor;
use crate::progress::{ProgressFn, ProgressUpdate};
use crate::session::Session;
use crate::stats::{ScenarioStats, StatsSnapshot};

/// Final product of one scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: String,
    pub stats: StatsSnapshot,
    pub elapsed: Duration,
    /// Set when the scenario completed without dispatching (failed login).
    pub warning: Option<String>,
}

/// Consumes scenario reports as they complete; rendering is up to the
/// implementation. Must tolerate zero-sample stats.
pub trait Reporter {
    fn report(&mut self, report: &ScenarioReport);
}

/// Composes a sequence of named scenarios and runs them strictly
/// sequentially, resetting the aggregator between scenarios.
pub struct ScenarioDriver<S, A> {
    session: Arc<S>,
    authenticator: A,
    credentials: Option<Credentials>,
    token: Option<Arc<str>>,
    login_failure: Option<String>,
    progress: Option<ProgressFn>,
}

impl<S: Session, A: Authenticator> ScenarioDriver<S, A> {
    #[must_use]
    pub fn new(session: Arc<S>, authenticator: A, credentials: Option<Credentials>) -> Self {
        Self {
            session,
            authenticator,
            credentials,
            token: None,
            login_failure: None,
            progress: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run one scenario to completion.
    ///
    /// A scenario that fails mandatory authentication completes with zero
    /// requests recorded and a warning on the report; expected request
    /// failures (timeouts, 429s, refused connections) are recorded outcomes
    /// and never surface as errors here.
    pub async fn run_scenario(&mut self, config: &ScenarioConfig) -> Result<ScenarioReport> {
        config.validate()?;

        let token = match config.auth {
            AuthMode::None => None,
            AuthMode::Bearer => match self.bearer_token().await {
                Ok(token) => Some(token),
                Err(err) => {
                    return Ok(ScenarioReport {
                        name: config.name.clone(),
                        stats: ScenarioStats::new().snapshot(),
                        elapsed: Duration::ZERO,
                        warning: Some(err.to_string()),
                    });
                }
            },
        };

        // Fresh aggregator per scenario: statistics never leak across runs.
        let stats = Arc::new(ScenarioStats::new());
        let executor = Arc::new(RequestExecutor::new(
            self.session.clone(),
            stats.clone(),
            config,
            token,
        ));

        let poller = self.progress.as_ref().map(|progress| {
            let progress = progress.clone();
            let stats = stats.clone();
            let scenario = config.name.clone();
            let total = config.requests;
            tokio::spawn(async move {
                let started = Instant::now();
                let mut interval = tokio::time::interval(Duration::from_secs(1));
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    interval.tick().await;
                    let snapshot = stats.snapshot();
                    (progress)(ProgressUpdate {
                        scenario: scenario.clone(),
                        completed: snapshot.total,
                        total,
                        elapsed: started.elapsed(),
                        snapshot,
                    });
                }
            })
        });

        let run = dispatch(config, |_, endpoint| {
            let executor = executor.clone();
            async move { executor.execute(&endpoint).await }
        })
        .await;

        if let Some(poller) = poller {
            poller.abort();
            let _ = poller.await;
        }

        let elapsed = run?;

        Ok(ScenarioReport {
            name: config.name.clone(),
            stats: stats.snapshot(),
            elapsed,
            warning: None,
        })
    }

    /// Run scenarios strictly sequentially, reporting each as it completes.
    /// Scenario N+1 does not start until scenario N's dispatch has returned.
    pub async fn run_all<R: Reporter>(
        &mut self,
        scenarios: &[ScenarioConfig],
        reporter: &mut R,
    ) -> Result<Vec<ScenarioReport>> {
        let mut reports = Vec::with_capacity(scenarios.len());
        for config in scenarios {
            let report = self.run_scenario(config).await?;
            reporter.report(&report);
            reports.push(report);
        }
        Ok(reports)
    }

    /// Token for the whole driver session: fetched on first use, then reused.
    /// A failed login is remembered too, so there are no login retries.
    async fn bearer_token(&mut self) -> Result<Arc<str>> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }
        if let Some(failure) = &self.login_failure {
            return Err(Error::Auth(failure.clone()));
        }

        let credentials = self
            .credentials
            .as_ref()
            .ok_or(Error::MissingCredentials)?;

        match self.authenticator.login(credentials).await {
            Ok(token) => {
                self.token = Some(token.clone());
                Ok(token)
            }
            Err(err) => {
                let message = err.to_string();
                self.login_failure = Some(message.clone());
                Err(Error::Auth(message))
            }
        }
    }
}
