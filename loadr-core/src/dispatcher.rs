use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::ScenarioConfig;
use crate::error::Result;
use crate::outcome::RequestOutcome;

/// Run `config.requests` logical requests with at most `config.concurrency`
/// concurrently in flight.
///
/// All task descriptors are constructed up front (index 0..N-1, endpoints
/// round-robin) and admitted through a K-wide semaphore as slots free up, so
/// a slow request delays only its own slot, never submission of the rest.
/// Completion order is unconstrained. Returns wall-clock elapsed time for
/// throughput computation.
pub async fn dispatch<F, Fut>(config: &ScenarioConfig, execute_one: F) -> Result<Duration>
where
    F: Fn(u64, Arc<str>) -> Fut,
    Fut: Future<Output = RequestOutcome> + Send + 'static,
{
    config.validate()?;

    let gate = Arc::new(Semaphore::new(config.concurrency));
    let started = Instant::now();

    let mut tasks = JoinSet::new();
    for index in 0..config.requests {
        let endpoint = config.endpoint_for(index);
        let gate = gate.clone();
        let work = execute_one(index, endpoint);

        tasks.spawn(async move {
            // The gate is never closed, so acquisition only ends with a permit.
            let _permit = gate.acquire_owned().await.ok();
            work.await
        });
    }

    while let Some(joined) = tasks.join_next().await {
        // The executor converts every failure into a recorded outcome; a join
        // error here means a panic, which is a defect worth surfacing.
        joined?;
    }

    Ok(started.elapsed())
}
