use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use relman::engine::{StatusReport, StepReport};
use relman::io;
use relman::release::{self, ReleaseOptions, ReleasePlan, ReleaseRun};

use super::CmdResult;
use crate::output::CmdFailure;

#[derive(Args)]
pub struct ReleaseArgs {
    #[command(subcommand)]
    command: ReleaseCommand,
}

#[derive(Subcommand)]
enum ReleaseCommand {
    /// Run the release pipeline
    Run(ReleaseFlags),
    /// Show which steps would run, without running anything
    Plan(ReleaseFlags),
}

#[derive(Args, Debug, Clone)]
pub struct ReleaseFlags {
    /// Skip the lint step
    #[arg(long)]
    no_lint: bool,
    /// Skip the test step
    #[arg(long)]
    no_test: bool,
    /// Skip the build step
    #[arg(long)]
    no_build: bool,
    /// Skip updating the contributors list
    #[arg(long)]
    no_contributors: bool,
    /// Skip the version bump
    #[arg(long)]
    no_bump: bool,
    /// Skip changelog generation
    #[arg(long)]
    no_changelog: bool,
    /// Skip creating a GitHub release
    #[arg(long)]
    no_ghrelease: bool,
    /// Skip publishing to the package registry
    #[arg(long)]
    no_publish: bool,
    /// Release type: major, minor, patch, premajor, preminor, prepatch, prerelease
    #[arg(long = "type", value_name = "TYPE", default_value = "patch")]
    release_type: String,
    /// Prerelease identifier (e.g. rc, beta)
    #[arg(long)]
    preid: Option<String>,
    /// GitHub access token (falls back to GH_TOKEN / GITHUB_TOKEN)
    #[arg(long)]
    ghtoken: Option<String>,
    /// Project directory
    #[arg(long, default_value = ".")]
    path: PathBuf,
}

impl ReleaseFlags {
    fn into_options(self) -> ReleaseOptions {
        let ghtoken = self.ghtoken.or_else(|| {
            std::env::var("GH_TOKEN")
                .or_else(|_| std::env::var("GITHUB_TOKEN"))
                .ok()
                .filter(|t| !t.is_empty())
        });

        ReleaseOptions {
            lint: !self.no_lint,
            test: !self.no_test,
            build: !self.no_build,
            contributors: !self.no_contributors,
            bump: !self.no_bump,
            changelog: !self.no_changelog,
            ghrelease: !self.no_ghrelease,
            publish: !self.no_publish,
            release_type: self.release_type,
            preid: self.preid,
            ghtoken,
            project_dir: io::expand_path(&self.path),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "command")]
pub enum ReleaseOutput {
    #[serde(rename = "release.run")]
    Run {
        run: ReleaseRun,
        report: Vec<StepReport>,
    },
    #[serde(rename = "release.plan")]
    Plan { plan: ReleasePlan },
}

/// Steps reached before a run failed, reported next to the error.
#[derive(Serialize)]
struct FailedRun {
    command: &'static str,
    report: Vec<StepReport>,
}

pub fn run(args: ReleaseArgs) -> CmdResult<ReleaseOutput> {
    match args.command {
        ReleaseCommand::Run(flags) => run_release(&flags.into_options()),
        ReleaseCommand::Plan(flags) => {
            let plan = release::plan(&flags.into_options())?;
            Ok((ReleaseOutput::Plan { plan }, 0))
        }
    }
}

fn run_release(options: &ReleaseOptions) -> CmdResult<ReleaseOutput> {
    let mut report = StatusReport::new();
    match release::run(options, &mut report) {
        Ok(run) => Ok((
            ReleaseOutput::Run {
                run,
                report: report.into_steps(),
            },
            0,
        )),
        Err(error) => {
            let failed = FailedRun {
                command: "release.run",
                report: report.into_steps(),
            };
            Err(CmdFailure::with_partial(error, &failed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::process::Command;

    fn git(dir: &Path, args: &[&str]) {
        let output = Command::new("git")
            .args(args)
            .current_dir(dir)
            .output()
            .unwrap();
        assert!(output.status.success(), "git {:?} failed: {:?}", args, output);
    }

    fn project(config: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path();
        git(path, &["init", "-q"]);
        git(path, &["config", "user.email", "ada@example.com"]);
        git(path, &["config", "user.name", "Ada"]);
        git(path, &["config", "commit.gpgsign", "false"]);
        fs::write(path.join("relman.json"), config).unwrap();
        fs::write(
            path.join("package.json"),
            "{\n  \"name\": \"app\",\n  \"version\": \"1.2.3\"\n}\n",
        )
        .unwrap();
        git(path, &["add", "."]);
        git(path, &["commit", "-q", "-m", "chore: initial package"]);
        dir
    }

    #[test]
    fn failed_run_keeps_error_and_report() {
        let dir = project(r#"{"commands": {"lint": "true", "test": "echo boom >&2; exit 3"}}"#);
        let options = ReleaseOptions {
            ghrelease: false,
            project_dir: dir.path().to_path_buf(),
            ..Default::default()
        };

        let failure = match run_release(&options) {
            Ok(_) => panic!("release should stop at the failing test command"),
            Err(failure) => failure,
        };

        assert_eq!(failure.error.code.as_str(), "step.command_failed");
        assert_eq!(failure.error.details["exitCode"], 3);

        let partial = failure.partial.unwrap();
        assert_eq!(partial["command"], "release.run");
        let report = partial["report"].as_array().unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0]["title"], "Lint");
        assert_eq!(report[0]["status"], "succeeded");
        assert_eq!(report[1]["title"], "Test");
        assert_eq!(report[1]["status"], "failed");
        assert_eq!(report[1]["error"], failure.error.message.as_str());
    }
}
