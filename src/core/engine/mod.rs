//! Generic step pipeline.
//!
//! - `context` - Shared mutable run state
//! - `gate` - Preconditions checked once before the first step
//! - `pipeline` - Step descriptors and the ordered, fail-fast runner
//! - `report` - Status observer used by the CLI
//!
//! Domain workflows (release) declare their steps and checks with these
//! primitives; the runner knows nothing about what a step does.

pub mod context;
pub mod gate;
pub mod pipeline;
pub mod report;

pub use context::Context;
pub use gate::{Gate, Precondition};
pub use pipeline::{
    NoopObserver, Pipeline, PipelineObserver, PipelineRun, PlannedStep, Step, StepRecord,
    StepStatus, StepTask, TitleHandle,
};
pub use report::{StatusReport, StepReport};
