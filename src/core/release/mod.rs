mod checks;
mod options;
mod steps;

pub use checks::release_gate;
pub use options::ReleaseOptions;
pub use steps::{
    release_steps, BUILD, BUMP, CHANGELOG, COMMIT, CONTRIBUTORS, GITHUB_RELEASE, LINT, PUBLISH,
    PUSH, TEST,
};

use serde::Serialize;

use crate::config::ReleaseConfig;
use crate::engine::{Context, Pipeline, PipelineObserver, PlannedStep, StepRecord};
use crate::error::Result;
use crate::manifest::Manifest;
use crate::version;

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseRun {
    pub project_dir: String,
    pub steps: Vec<StepRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributors_updated: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleasePlan {
    pub project_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_version: Option<String>,
    pub checks: Vec<String>,
    pub steps: Vec<PlannedStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

/// The release pipeline: precondition checks plus the declared steps.
pub fn pipeline(config: ReleaseConfig) -> Pipeline {
    Pipeline::new(release_steps(config)).with_gate(release_gate())
}

/// Run a release with the project's `relman.json` (or defaults).
///
/// The first failing check or step is returned unchanged.
pub fn run(options: &ReleaseOptions, observer: &mut dyn PipelineObserver) -> Result<ReleaseRun> {
    let config = ReleaseConfig::load(&options.project_dir)?;
    let mut ctx = Context::from_options(options)?;

    let result = pipeline(config).run(&mut ctx, observer)?;

    Ok(ReleaseRun {
        project_dir: options.project_dir.display().to_string(),
        steps: result.steps,
        previous_version: ctx.str("previous_version").map(str::to_string),
        new_version: ctx.str("new_version").map(str::to_string),
        tag: ctx.str("tag").map(str::to_string),
        release_url: ctx.str("release_url").map(str::to_string),
        contributors_updated: ctx.get("contributors_updated").and_then(|v| v.as_bool()),
    })
}

/// Preview which steps the options enable, without running anything.
///
/// Enablement is evaluated against the initial context only; a real run
/// re-evaluates each step as it is reached.
pub fn plan(options: &ReleaseOptions) -> Result<ReleasePlan> {
    let config = ReleaseConfig::load(&options.project_dir)?;
    let ctx = Context::from_options(options)?;
    let mut warnings = Vec::new();

    let current_version = match config
        .manifest_path(&options.project_dir)
        .and_then(|path| Manifest::load(&path))
        .and_then(|manifest| manifest.version())
    {
        Ok(v) => Some(v),
        Err(e) => {
            warnings.push(e.message);
            None
        }
    };

    let next_version = match (&current_version, options.bump) {
        (Some(current), true) => {
            let release_type: version::ReleaseType = options.release_type.parse()?;
            Some(version::increment(
                current,
                release_type,
                options.preid.as_deref(),
            )?)
        }
        _ => None,
    };

    let gate = release_gate();
    let checks = gate.names().into_iter().map(str::to_string).collect();
    let pipeline = Pipeline::new(release_steps(config)).with_gate(gate);

    Ok(ReleasePlan {
        project_dir: options.project_dir.display().to_string(),
        current_version,
        next_version,
        checks,
        steps: pipeline.plan(&ctx),
        warnings,
        hints: vec!["Preview only: nothing was run".to_string()],
    })
}
