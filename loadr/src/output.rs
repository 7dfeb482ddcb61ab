use loadr_core::{ProgressFn, Reporter, ScenarioConfig, ScenarioReport};

pub(crate) mod human;
pub(crate) mod json;

/// Rendering backend for a run: header, optional live progress, per-scenario
/// reports (via `Reporter`), and the final roll-up.
pub(crate) trait OutputFormatter: Reporter {
    fn print_header(&mut self, base_url: &str, scenarios: &[ScenarioConfig]);
    fn progress(&self) -> Option<ProgressFn>;
    fn finish(&mut self, reports: &[ScenarioReport]);
}
