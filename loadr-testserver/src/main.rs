use std::time::Duration;

use loadr_testserver::{RateLimit, TestServer, TestServerOptions};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Throttle generously so flood experiments can actually trip the limiter.
    let options = TestServerOptions {
        rate_limit: Some(RateLimit {
            max_requests: 1000,
            window: Duration::from_secs(60),
        }),
        response_delay: Duration::ZERO,
    };

    let server = TestServer::start_with(options).await?;
    println!("loadr-testserver listening on {}", server.base_url());

    tokio::signal::ctrl_c().await?;
    server.shutdown().await;
    Ok(())
}
