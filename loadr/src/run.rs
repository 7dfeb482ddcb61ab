use std::sync::Arc;

use anyhow::Context as _;
use loadr_core::{
    Credentials, HttpAuthenticator, HttpSession, ScenarioConfig, ScenarioDriver,
};

use crate::cli::{OutputFormat, RunArgs, Suite};
use crate::exit_codes::ExitCode;
use crate::output::OutputFormatter;
use crate::output::human::HumanOutput;
use crate::output::json::JsonOutput;
use crate::suites;

pub async fn run(args: RunArgs) -> anyhow::Result<ExitCode> {
    match args.output {
        OutputFormat::HumanReadable => run_with(args, HumanOutput::new()).await,
        OutputFormat::Json => run_with(args, JsonOutput).await,
    }
}

async fn run_with<F: OutputFormatter>(args: RunArgs, mut formatter: F) -> anyhow::Result<ExitCode> {
    let scenarios = match &args.endpoint {
        Some(endpoint) => vec![ad_hoc_scenario(endpoint, &args)?],
        None => match args.suite {
            Suite::Standard => suites::standard(),
            Suite::Extreme => suites::extreme(),
        },
    };

    let client = loadr_http::HttpClient::default();
    let session = Arc::new(HttpSession::new(client, &args.base_url));
    let authenticator = HttpAuthenticator::new(session.clone());
    let credentials = Some(Credentials::new(&args.identifier, &args.password));

    formatter.print_header(&args.base_url, &scenarios);

    let mut driver = ScenarioDriver::new(session, authenticator, credentials);
    if let Some(progress) = formatter.progress() {
        driver = driver.with_progress(progress);
    }

    let reports = driver.run_all(&scenarios, &mut formatter).await?;

    for report in &reports {
        if let Some(warning) = &report.warning {
            eprintln!("warning: scenario '{}' skipped: {warning}", report.name);
        }
    }

    formatter.finish(&reports);

    Ok(ExitCode::Success)
}

fn ad_hoc_scenario(endpoint: &str, args: &RunArgs) -> anyhow::Result<ScenarioConfig> {
    let method: http::Method = args
        .method
        .to_uppercase()
        .parse()
        .with_context(|| format!("invalid http method: {}", args.method))?;

    let mut config = ScenarioConfig::new("ad-hoc", endpoint)
        .method(method)
        .load(args.concurrency, args.requests)
        .deadline(args.deadline);
    if args.auth {
        config = config.bearer_auth();
    }

    Ok(config)
}
