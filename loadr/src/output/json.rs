use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use loadr_core::{ProgressFn, ProgressUpdate, Reporter, ScenarioConfig, ScenarioReport};

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl Reporter for JsonOutput {
    fn report(&mut self, report: &ScenarioReport) {
        emit_json_line(&build_scenario_line(report));
    }
}

impl OutputFormatter for JsonOutput {
    fn print_header(&mut self, _base_url: &str, _scenarios: &[ScenarioConfig]) {}

    fn progress(&self) -> Option<ProgressFn> {
        Some(Arc::new(move |update| {
            emit_json_line(&build_progress_line(&update));
        }))
    }

    fn finish(&mut self, reports: &[ScenarioReport]) {
        emit_json_line(&build_summary_line(reports));
    }
}

#[derive(Debug, Serialize)]
struct JsonProgressLine<'a> {
    kind: &'static str,
    scenario: &'a str,
    completed: u64,
    total: u64,
    elapsed_secs: f64,
}

#[derive(Debug, Serialize)]
struct JsonScenarioLine<'a> {
    kind: &'static str,
    scenario: &'a str,
    requests_total: u64,
    success: u64,
    rate_limited: u64,
    application_failure: u64,
    timeout: u64,
    connection_failure: u64,
    success_rate: f64,
    loss_rate: f64,
    elapsed_ms: u64,
    requests_per_sec: f64,
    latency_mean_ms: f64,
    latency_min_ms: f64,
    latency_max_ms: f64,
    latency_p50_ms: f64,
    latency_p90_ms: f64,
    latency_p99_ms: f64,
    errors: BTreeMap<&'a str, u64>,
    warning: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct JsonSummaryLine {
    kind: &'static str,
    scenarios: usize,
    requests_total: u64,
    success_total: u64,
    rate_limited_total: u64,
    application_failure_total: u64,
    timeout_total: u64,
    connection_failure_total: u64,
}

fn build_progress_line(update: &ProgressUpdate) -> JsonProgressLine<'_> {
    JsonProgressLine {
        kind: "progress",
        scenario: &update.scenario,
        completed: update.completed,
        total: update.total,
        elapsed_secs: update.elapsed.as_secs_f64(),
    }
}

fn build_scenario_line(report: &ScenarioReport) -> JsonScenarioLine<'_> {
    let s = &report.stats;
    let ms = |d: std::time::Duration| d.as_secs_f64() * 1000.0;

    JsonScenarioLine {
        kind: "scenario",
        scenario: &report.name,
        requests_total: s.total,
        success: s.success,
        rate_limited: s.rate_limited,
        application_failure: s.application_failure,
        timeout: s.timeout,
        connection_failure: s.connection_failure,
        success_rate: s.success_rate(),
        loss_rate: s.loss_rate(),
        elapsed_ms: report.elapsed.as_millis() as u64,
        requests_per_sec: s.throughput(report.elapsed),
        latency_mean_ms: ms(s.latency.mean),
        latency_min_ms: ms(s.latency.min),
        latency_max_ms: ms(s.latency.max),
        latency_p50_ms: ms(s.latency.p50),
        latency_p90_ms: ms(s.latency.p90),
        latency_p99_ms: ms(s.latency.p99),
        errors: s
            .errors
            .iter()
            .map(|(key, count)| (key.as_str(), *count))
            .collect(),
        warning: report.warning.as_deref(),
    }
}

fn build_summary_line(reports: &[ScenarioReport]) -> JsonSummaryLine {
    let mut line = JsonSummaryLine {
        kind: "summary",
        scenarios: reports.len(),
        requests_total: 0,
        success_total: 0,
        rate_limited_total: 0,
        application_failure_total: 0,
        timeout_total: 0,
        connection_failure_total: 0,
    };

    for report in reports {
        let s = &report.stats;
        line.requests_total += s.total;
        line.success_total += s.success;
        line.rate_limited_total += s.rate_limited;
        line.application_failure_total += s.application_failure;
        line.timeout_total += s.timeout;
        line.connection_failure_total += s.connection_failure;
    }

    line
}

fn emit_json_line<T: Serialize>(line: &T) {
    match serde_json::to_string(line) {
        Ok(s) => println!("{s}"),
        Err(err) => eprintln!("failed to serialize output line: {err}"),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use loadr_core::StatsSnapshot;
    use std::time::Duration;

    #[test]
    fn scenario_lines_round_trip_through_serde() {
        let report = ScenarioReport {
            name: "health-check".to_string(),
            stats: StatsSnapshot {
                total: 200,
                success: 180,
                rate_limited: 20,
                ..StatsSnapshot::default()
            },
            elapsed: Duration::from_millis(1500),
            warning: None,
        };

        let line = serde_json::to_value(build_scenario_line(&report)).unwrap();
        assert_eq!(line["kind"], "scenario");
        assert_eq!(line["requests_total"], 200);
        assert_eq!(line["success"], 180);
        assert_eq!(line["rate_limited"], 20);
        assert_eq!(line["elapsed_ms"], 1500);
        assert!(line["warning"].is_null());
    }

    #[test]
    fn summary_lines_roll_up_all_scenarios() {
        let reports = vec![
            ScenarioReport {
                name: "a".to_string(),
                stats: StatsSnapshot {
                    total: 10,
                    success: 10,
                    ..StatsSnapshot::default()
                },
                elapsed: Duration::from_millis(100),
                warning: None,
            },
            ScenarioReport {
                name: "b".to_string(),
                stats: StatsSnapshot {
                    total: 5,
                    timeout: 5,
                    ..StatsSnapshot::default()
                },
                elapsed: Duration::from_millis(100),
                warning: None,
            },
        ];

        let line = build_summary_line(&reports);
        assert_eq!(line.scenarios, 2);
        assert_eq!(line.requests_total, 15);
        assert_eq!(line.success_total, 10);
        assert_eq!(line.timeout_total, 5);
    }
}
