use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use loadr_core::{ProgressFn, Reporter, ScenarioConfig, ScenarioReport};

use super::OutputFormatter;

pub(crate) struct HumanOutput {
    // Shared with the progress callback; one bar per running scenario.
    bar: Arc<Mutex<Option<(String, ProgressBar)>>>,
}

impl HumanOutput {
    pub(crate) fn new() -> Self {
        Self {
            bar: Arc::new(Mutex::new(None)),
        }
    }

    fn clear_bar(&self) {
        let mut bar = self
            .bar
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some((_, bar)) = bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Reporter for HumanOutput {
    fn report(&mut self, report: &ScenarioReport) {
        self.clear_bar();
        print!("{}", render_report(report));
    }
}

impl OutputFormatter for HumanOutput {
    fn print_header(&mut self, base_url: &str, scenarios: &[ScenarioConfig]) {
        println!("target: {base_url}");
        for s in scenarios {
            let endpoints = s
                .endpoints
                .iter()
                .map(|e| e.as_ref())
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "  {}: {} {} (gate {}, total {}, deadline {})",
                s.name,
                s.method,
                endpoints,
                s.concurrency,
                s.requests,
                humantime::format_duration(s.deadline),
            );
        }
        println!();
    }

    fn progress(&self) -> Option<ProgressFn> {
        let state = self.bar.clone();
        Some(Arc::new(move |update| {
            let mut state = state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            let stale = match &*state {
                Some((name, _)) => name != &update.scenario,
                None => true,
            };
            if stale {
                if let Some((_, bar)) = state.take() {
                    bar.finish_and_clear();
                }
                let style = ProgressStyle::with_template("{msg:24} [{bar:32}] {pos}/{len}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar());
                let bar = ProgressBar::new(update.total)
                    .with_style(style)
                    .with_message(update.scenario.clone());
                *state = Some((update.scenario.clone(), bar));
            }

            if let Some((_, bar)) = &*state {
                bar.set_position(update.completed);
            }
        }))
    }

    fn finish(&mut self, reports: &[ScenarioReport]) {
        self.clear_bar();

        let mut out = String::new();
        out.push_str("totals\n");

        let mut requests = 0u64;
        let mut success = 0u64;
        let mut lost = 0u64;
        let mut elapsed = Duration::ZERO;
        for report in reports {
            requests += report.stats.total;
            success += report.stats.success;
            lost += report.stats.timeout + report.stats.connection_failure;
            elapsed += report.elapsed;
        }

        writeln!(
            &mut out,
            "  requests: {requests} (success {success}, lost {lost})"
        )
        .ok();
        writeln!(&mut out, "  scenarios: {}", reports.len()).ok();
        writeln!(&mut out, "  elapsed: {}", format_latency(elapsed)).ok();

        print!("{out}");
    }
}

fn render_report(report: &ScenarioReport) -> String {
    let mut out = String::new();
    writeln!(&mut out, "scenario: {}", report.name).ok();

    if let Some(warning) = &report.warning {
        writeln!(&mut out, "  skipped: {warning}").ok();
        out.push('\n');
        return out;
    }

    let s = &report.stats;
    writeln!(
        &mut out,
        "  requests: {} (success {}, rate_limited {}, app_failure {}, timeout {}, connection_failure {})",
        s.total, s.success, s.rate_limited, s.application_failure, s.timeout, s.connection_failure
    )
    .ok();
    writeln!(
        &mut out,
        "  rates: success {:.1}% loss {:.1}%",
        s.success_rate() * 100.0,
        s.loss_rate() * 100.0
    )
    .ok();

    if s.latency.count > 0 {
        writeln!(
            &mut out,
            "  latency = p50={} p90={} p99={} mean={} min={} max={} (n={})",
            format_latency(s.latency.p50),
            format_latency(s.latency.p90),
            format_latency(s.latency.p99),
            format_latency(s.latency.mean),
            format_latency(s.latency.min),
            format_latency(s.latency.max),
            s.latency.count
        )
        .ok();
    } else {
        out.push_str("  latency: n/a\n");
    }

    writeln!(
        &mut out,
        "  elapsed: {}  throughput: {} req/s",
        format_latency(report.elapsed),
        format_rate(s.throughput(report.elapsed))
    )
    .ok();

    if s.rate_limited > 0 {
        writeln!(
            &mut out,
            "  rate limiting: active ({} blocked)",
            s.rate_limited
        )
        .ok();
    } else {
        out.push_str("  rate limiting: not observed\n");
    }

    if !s.errors.is_empty() {
        out.push_str("  errors:\n");
        for (key, count) in s.errors.iter().take(5) {
            writeln!(&mut out, "    {key}: {count}").ok();
        }
    }

    out.push('\n');
    out
}

fn format_latency(d: Duration) -> String {
    if d >= Duration::from_secs(1) {
        return format!("{:.2}s", d.as_secs_f64());
    }
    if d >= Duration::from_millis(1) {
        return format!("{:.1}ms", d.as_secs_f64() * 1000.0);
    }
    format!("{}µs", d.as_micros())
}

fn format_rate(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.0}")
    } else {
        "0".to_string()
    }
}
