//! Per-step status reporting for interactive runs.

use serde::Serialize;

use crate::error::Error;

use super::pipeline::{PipelineObserver, StepStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub title: String,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Records every step outcome and echoes progress to stderr.
///
/// Unlike the `PipelineRun` returned on success, this also captures the
/// failed step, so the caller can show how far a failed run got.
#[derive(Debug, Default)]
pub struct StatusReport {
    steps: Vec<StepReport>,
}

impl StatusReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_steps(self) -> Vec<StepReport> {
        self.steps
    }

    fn record(&mut self, title: &str, status: StepStatus, error: Option<String>) {
        self.steps.push(StepReport {
            title: title.to_string(),
            status,
            error,
        });
    }
}

impl PipelineObserver for StatusReport {
    fn step_started(&mut self, _index: usize, title: &str) {
        log_status!("release", "{} ...", title);
    }

    fn step_skipped(&mut self, _index: usize, title: &str) {
        log_status!("release", "{} [skipped]", title);
        self.record(title, StepStatus::Skipped, None);
    }

    fn title_changed(&mut self, _index: usize, title: &str) {
        log_status!("release", "{}", title);
    }

    fn step_output(&mut self, _index: usize, message: &str) {
        log_status!("release", "  {}", message);
    }

    fn step_succeeded(&mut self, _index: usize, title: &str) {
        log_status!("release", "{} [done]", title);
        self.record(title, StepStatus::Succeeded, None);
    }

    fn step_failed(&mut self, _index: usize, title: &str, error: &Error) {
        log_status!("release", "{} [failed] {}", title, error.message);
        self.record(title, StepStatus::Failed, Some(error.message.clone()));
    }
}
