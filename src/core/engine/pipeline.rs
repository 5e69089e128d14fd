use serde::Serialize;

use crate::error::{Error, Result};

use super::context::Context;
use super::gate::Gate;

/// Unit of work run by the pipeline.
///
/// A task receives the live context and a handle for updating its own display
/// title. Returning `Err` stops the whole run; the error is surfaced to the
/// caller unchanged.
pub trait StepTask {
    fn run(&self, ctx: &mut Context, title: &mut TitleHandle<'_>) -> Result<()>;
}

impl<F> StepTask for F
where
    F: Fn(&mut Context, &mut TitleHandle<'_>) -> Result<()>,
{
    fn run(&self, ctx: &mut Context, title: &mut TitleHandle<'_>) -> Result<()> {
        self(ctx, title)
    }
}

/// Step status hooks. Every method defaults to a no-op.
pub trait PipelineObserver {
    fn step_started(&mut self, _index: usize, _title: &str) {}
    fn step_skipped(&mut self, _index: usize, _title: &str) {}
    fn title_changed(&mut self, _index: usize, _title: &str) {}
    fn step_output(&mut self, _index: usize, _message: &str) {}
    fn step_succeeded(&mut self, _index: usize, _title: &str) {}
    fn step_failed(&mut self, _index: usize, _title: &str, _error: &Error) {}
}

pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Lets a running step rewrite its display title or emit progress lines.
pub struct TitleHandle<'a> {
    index: usize,
    title: String,
    observer: &'a mut dyn PipelineObserver,
}

impl<'a> TitleHandle<'a> {
    fn new(index: usize, title: &str, observer: &'a mut dyn PipelineObserver) -> Self {
        Self {
            index,
            title: title.to_string(),
            observer,
        }
    }

    pub fn set(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.observer.title_changed(self.index, &self.title);
    }

    /// Append detail to the current title, e.g. `": v1.2.3 -> v1.3.0"`.
    pub fn append(&mut self, detail: &str) {
        let title = format!("{}{}", self.title, detail);
        self.set(title);
    }

    pub fn output(&mut self, message: &str) {
        self.observer.step_output(self.index, message);
    }

    fn into_title(self) -> String {
        self.title
    }
}

enum Enablement {
    Always,
    Flag(String),
    When(Box<dyn Fn(&Context) -> bool>),
}

/// Step descriptor: display title, enablement predicate, work function.
pub struct Step {
    title: String,
    enablement: Enablement,
    task: Box<dyn StepTask>,
}

impl Step {
    pub fn new(title: impl Into<String>, task: impl StepTask + 'static) -> Self {
        Self {
            title: title.into(),
            enablement: Enablement::Always,
            task: Box::new(task),
        }
    }

    /// Build a step from a closure.
    pub fn from_fn<F>(title: impl Into<String>, task: F) -> Self
    where
        F: Fn(&mut Context, &mut TitleHandle<'_>) -> Result<()> + 'static,
    {
        Self::new(title, task)
    }

    /// Gate the step on a boolean context flag. An absent flag disables it.
    pub fn enabled_by(mut self, flag: impl Into<String>) -> Self {
        self.enablement = Enablement::Flag(flag.into());
        self
    }

    /// Gate the step on an arbitrary side-effect-free predicate.
    pub fn enabled_when(mut self, predicate: impl Fn(&Context) -> bool + 'static) -> Self {
        self.enablement = Enablement::When(Box::new(predicate));
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Name of the gating flag, if the step is gated by one.
    pub fn flag(&self) -> Option<&str> {
        match &self.enablement {
            Enablement::Flag(flag) => Some(flag),
            _ => None,
        }
    }

    pub fn is_enabled(&self, ctx: &Context) -> bool {
        match &self.enablement {
            Enablement::Always => true,
            Enablement::Flag(flag) => ctx.flag(flag),
            Enablement::When(predicate) => predicate(ctx),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Skipped,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub title: String,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub steps: Vec<StepRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedStep {
    pub title: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
}

/// Ordered, fail-fast step runner.
pub struct Pipeline {
    gate: Gate,
    steps: Vec<Step>,
}

impl Pipeline {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            gate: Gate::new(),
            steps,
        }
    }

    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }

    /// Preview enablement against a context without running anything.
    pub fn plan(&self, ctx: &Context) -> Vec<PlannedStep> {
        self.steps
            .iter()
            .map(|step| PlannedStep {
                title: step.title.clone(),
                enabled: step.is_enabled(ctx),
                flag: step.flag().map(str::to_string),
            })
            .collect()
    }

    /// Run the gate once, then every step in declared order.
    ///
    /// Enablement is evaluated immediately before each step against the
    /// current context. The first failing step ends the run and its error is
    /// returned as-is; later steps are never invoked.
    pub fn run(
        &self,
        ctx: &mut Context,
        observer: &mut dyn PipelineObserver,
    ) -> Result<PipelineRun> {
        self.gate.run(ctx)?;

        let mut records = Vec::with_capacity(self.steps.len());

        for (index, step) in self.steps.iter().enumerate() {
            if !step.is_enabled(ctx) {
                observer.step_skipped(index, &step.title);
                records.push(StepRecord {
                    title: step.title.clone(),
                    status: StepStatus::Skipped,
                });
                continue;
            }

            observer.step_started(index, &step.title);
            let mut handle = TitleHandle::new(index, &step.title, &mut *observer);
            let outcome = step.task.run(ctx, &mut handle);
            let title = handle.into_title();

            match outcome {
                Ok(()) => {
                    observer.step_succeeded(index, &title);
                    records.push(StepRecord {
                        title,
                        status: StepStatus::Succeeded,
                    });
                }
                Err(err) => {
                    observer.step_failed(index, &title, &err);
                    return Err(err);
                }
            }
        }

        Ok(PipelineRun { steps: records })
    }
}
