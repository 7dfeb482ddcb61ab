use clap::{Args, Parser, Subcommand};
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 500ms, 5s, 1m)".to_string());
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!(
            "invalid duration '{s}' (expected e.g. 500ms, 5s, 1m)"
        ));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 500ms, 5s, 1m)"))?;

    match unit_str.trim() {
        "" | "s" => Ok(Duration::from_secs(value)),
        "ms" => Ok(Duration::from_millis(value)),
        "m" => value
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration '{s}' is too large")),
        _ => Err(format!(
            "invalid duration '{s}' (expected e.g. 500ms, 5s, 1m)"
        )),
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary per scenario.
    HumanReadable,
    /// Emit JSON lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Suite {
    /// Ramping request volumes plus a rate-limit burst.
    Standard,
    /// Hostile settings meant to force timeouts and connection loss.
    Extreme,
}

#[derive(Debug, Parser)]
#[command(
    name = "loadr",
    author,
    version,
    about = "Bounded-concurrency HTTP load generator with failure classification",
    long_about = "loadr issues a configured volume of HTTP requests against a target service under a fixed concurrency gate, classifies every outcome (success, rate-limited, application failure, timeout, connection failure), and reports latency and outcome statistics per scenario.\n\nScenarios run strictly sequentially; a bearer token is obtained once via the target's login endpoint and reused for every scenario that needs it.",
    after_help = "Examples:\n  loadr run --base-url http://localhost:3000\n  loadr run --suite extreme --identifier testuser --password 123456\n  loadr run --endpoint /health --concurrency 25 --requests 200 --output json\n  loadr flood --url http://localhost:3000/health --burst 50 --waves 10"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a scenario suite (or a single ad hoc scenario) against a target
    #[command(
        long_about = "Run load scenarios against a target service.\n\nBy default the standard suite runs; pass --endpoint to run a single ad hoc scenario instead."
    )]
    Run(RunArgs),

    /// Blast the target with short-lived curl processes in waves
    Flood(FloodArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Base URL of the target service
    #[arg(long, default_value = "http://localhost:3000")]
    pub base_url: String,

    /// Built-in scenario suite to run
    #[arg(long, value_enum, default_value_t = Suite::Standard)]
    pub suite: Suite,

    /// Run a single scenario against this endpoint path instead of a suite
    #[arg(long, conflicts_with = "suite")]
    pub endpoint: Option<String>,

    /// Concurrency gate width for --endpoint
    #[arg(long, default_value_t = 10)]
    pub concurrency: usize,

    /// Total requests for --endpoint
    #[arg(long, default_value_t = 100)]
    pub requests: u64,

    /// Per-request deadline (e.g. 500ms, 5s)
    #[arg(long, value_parser = parse_duration, default_value = "5s")]
    pub deadline: Duration,

    /// HTTP method for --endpoint
    #[arg(long, default_value = "GET")]
    pub method: String,

    /// Send the bearer token with --endpoint requests
    #[arg(long)]
    pub auth: bool,

    /// Login identifier used to obtain the bearer token
    #[arg(long, default_value = "testuser")]
    pub identifier: String,

    /// Login password
    #[arg(long, default_value = "123456")]
    pub password: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct FloodArgs {
    /// Full URL each curl process requests
    #[arg(long, default_value = "http://localhost:3000/health")]
    pub url: String,

    /// Concurrent curl processes per wave
    #[arg(long, default_value_t = 50)]
    pub burst: usize,

    /// Number of waves
    #[arg(long, default_value_t = 10)]
    pub waves: usize,

    /// Per-process timeout handed to `curl -m` (seconds, fractional ok)
    #[arg(long, default_value = "0.1")]
    pub timeout: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_accepts_common_units() {
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration("5s"), Ok(Duration::from_secs(5)));
        assert_eq!(parse_duration("10"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("1m"), Ok(Duration::from_secs(60)));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
    }

    #[test]
    fn cli_parses_an_ad_hoc_run() {
        let parsed = Cli::try_parse_from([
            "loadr",
            "run",
            "--base-url",
            "http://localhost:9000",
            "--endpoint",
            "/health",
            "--concurrency",
            "25",
            "--requests",
            "200",
            "--deadline",
            "500ms",
            "--output",
            "json",
        ]);

        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.base_url, "http://localhost:9000");
                assert_eq!(args.endpoint.as_deref(), Some("/health"));
                assert_eq!(args.concurrency, 25);
                assert_eq!(args.requests, 200);
                assert_eq!(args.deadline, Duration::from_millis(500));
                assert!(matches!(args.output, OutputFormat::Json));
            }
            Command::Flood(_) => panic!("expected run command"),
        }
    }

    #[test]
    fn cli_parses_flood_defaults() {
        let parsed = Cli::try_parse_from(["loadr", "flood"]);
        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Flood(args) => {
                assert_eq!(args.burst, 50);
                assert_eq!(args.waves, 10);
                assert_eq!(args.timeout, "0.1");
            }
            Command::Run(_) => panic!("expected flood command"),
        }
    }

    #[test]
    fn suite_and_endpoint_are_mutually_exclusive() {
        let parsed = Cli::try_parse_from([
            "loadr",
            "run",
            "--suite",
            "extreme",
            "--endpoint",
            "/health",
        ]);
        assert!(parsed.is_err());
    }
}
