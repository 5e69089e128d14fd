//! The release steps, in the order they run.
//!
//! Each step is an independent [`StepTask`]. Steps talk to each other only
//! through the context: Bump writes `previous_version`/`new_version`,
//! Changelog writes `changelog_notes`, Commit writes `tag`, and the GitHub
//! release writes `release_url`.

use std::path::Path;
use std::rc::Rc;

use crate::changelog;
use crate::config::{ReleaseConfig, ToolCommand};
use crate::contributors;
use crate::engine::{Context, Step, StepTask, TitleHandle};
use crate::error::{Error, Result};
use crate::git;
use crate::github::{GithubClient, ReleaseRequest, RepoSlug};
use crate::manifest::{Manifest, ManifestKind};
use crate::utils::{command, io};
use crate::version::{self, ReleaseType};

use super::checks::project_dir;

pub const LINT: &str = "Lint";
pub const TEST: &str = "Test";
pub const BUILD: &str = "Build";
pub const CONTRIBUTORS: &str = "Update Contributors";
pub const BUMP: &str = "Bump Version";
pub const CHANGELOG: &str = "Generate Changelog";
pub const COMMIT: &str = "Commit to Git";
pub const PUSH: &str = "Push to GitHub";
pub const GITHUB_RELEASE: &str = "Generate GitHub Release";
pub const PUBLISH: &str = "Publish";

/// Declared release step order.
pub fn release_steps(config: ReleaseConfig) -> Vec<Step> {
    let config = Rc::new(config);
    let tool = |tool: ToolCommand| ToolStep {
        tool,
        config: Rc::clone(&config),
    };

    vec![
        Step::new(LINT, tool(ToolCommand::Lint)).enabled_by("lint"),
        Step::new(TEST, tool(ToolCommand::Test)).enabled_by("test"),
        Step::new(BUILD, tool(ToolCommand::Build)).enabled_by("build"),
        Step::new(CONTRIBUTORS, ContributorsStep(Rc::clone(&config))).enabled_by("contributors"),
        Step::new(BUMP, BumpStep(Rc::clone(&config))).enabled_by("bump"),
        Step::new(CHANGELOG, ChangelogStep(Rc::clone(&config))).enabled_by("changelog"),
        Step::new(COMMIT, CommitStep(Rc::clone(&config))),
        Step::new(PUSH, PushStep(Rc::clone(&config))),
        Step::new(GITHUB_RELEASE, GithubReleaseStep(Rc::clone(&config))).enabled_by("ghrelease"),
        Step::new(PUBLISH, tool(ToolCommand::Publish)).enabled_by("publish"),
    ]
}

fn load_manifest(config: &ReleaseConfig, dir: &Path) -> Result<Manifest> {
    Manifest::load(&config.manifest_path(dir)?)
}

/// Version being released: the bumped one when Bump ran, else the manifest's.
fn release_version(ctx: &Context, config: &ReleaseConfig, dir: &Path) -> Result<String> {
    match ctx.str("new_version") {
        Some(v) => Ok(v.to_string()),
        None => load_manifest(config, dir)?.version(),
    }
}

/// Repository path relative to the project, for `git add`.
fn relative(dir: &Path, path: &Path) -> String {
    path.strip_prefix(dir)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

/// GitHub repository: configured, else parsed from the push remote, else
/// from the manifest's repository field.
fn resolve_repo(config: &ReleaseConfig, dir: &Path) -> Option<RepoSlug> {
    if let Some(repo) = &config.github.repo {
        return RepoSlug::parse(repo);
    }
    git::remote_url(dir, &config.remote)
        .and_then(|url| RepoSlug::parse(&url))
        .or_else(|| {
            load_manifest(config, dir)
                .ok()
                .and_then(|m| m.repository_url())
                .and_then(|url| RepoSlug::parse(&url))
        })
}

/// Lint, Test, Build and Publish: one shell command each.
struct ToolStep {
    tool: ToolCommand,
    config: Rc<ReleaseConfig>,
}

impl ToolStep {
    /// The shell command to run, plus the version being published for Publish.
    fn command(&self, ctx: &Context, dir: &Path) -> Result<(String, Option<String>)> {
        let published = match self.tool {
            ToolCommand::Publish => Some(release_version(ctx, &self.config, dir)?),
            _ => None,
        };
        let prerelease = published.as_deref().is_some_and(version::is_prerelease);

        let command = self.config.command_for(self.tool, prerelease, || {
            Ok(load_manifest(&self.config, dir)?.kind())
        })?;
        Ok((command, published))
    }
}

impl StepTask for ToolStep {
    fn run(&self, ctx: &mut Context, title: &mut TitleHandle<'_>) -> Result<()> {
        let dir = project_dir(ctx)?;
        let (command, version) = self.command(ctx, &dir)?;

        title.output(&format!("$ {}", command));
        command::run_shell_in(&dir, &command)?;

        if let Some(version) = version {
            title.append(&format!(": v{}", version));
        }
        Ok(())
    }
}

struct ContributorsStep(Rc<ReleaseConfig>);

impl StepTask for ContributorsStep {
    fn run(&self, ctx: &mut Context, title: &mut TitleHandle<'_>) -> Result<()> {
        let dir = project_dir(ctx)?;
        let mut manifest = load_manifest(&self.0, &dir)?;
        if manifest.kind() != ManifestKind::Npm {
            title.output("Contributors are only tracked in package.json");
            ctx.set("contributors_updated", false);
            return Ok(());
        }
        let update = contributors::update(&dir, &mut manifest)?;

        title.output(&format!("{} contributors", update.contributors.len()));
        ctx.set("contributors_updated", update.updated);
        Ok(())
    }
}

struct BumpStep(Rc<ReleaseConfig>);

impl StepTask for BumpStep {
    fn run(&self, ctx: &mut Context, title: &mut TitleHandle<'_>) -> Result<()> {
        let dir = project_dir(ctx)?;
        let release_type: ReleaseType = ctx.require_str("type")?.parse()?;
        let preid = ctx.str("preid").map(str::to_string);

        let mut manifest = load_manifest(&self.0, &dir)?;
        let current = manifest.version()?;
        let next = version::increment(&current, release_type, preid.as_deref())?;

        title.append(&format!(": v{} -> v{}", current, next));
        manifest.set_version(&next)?;
        manifest.save()?;

        ctx.set("previous_version", current);
        ctx.set("new_version", next);
        Ok(())
    }
}

struct ChangelogStep(Rc<ReleaseConfig>);

impl StepTask for ChangelogStep {
    fn run(&self, ctx: &mut Context, title: &mut TitleHandle<'_>) -> Result<()> {
        let dir = project_dir(ctx)?;
        let version = release_version(ctx, &self.0, &dir)?;
        let previous_tag = git::get_latest_tag(&dir);
        let repo_url = resolve_repo(&self.0, &dir).map(|slug| slug.web_url());

        let generated = changelog::generate(
            &dir,
            &self.0.changelog_path(&dir),
            &version,
            previous_tag.as_deref(),
            &self.0.tag_name(&version),
            repo_url.as_deref(),
        )?;

        title.output(&format!("{} commits", generated.commit_count));
        ctx.set("changelog_notes", generated.notes);
        Ok(())
    }
}

struct CommitStep(Rc<ReleaseConfig>);

impl StepTask for CommitStep {
    fn run(&self, ctx: &mut Context, title: &mut TitleHandle<'_>) -> Result<()> {
        let dir = project_dir(ctx)?;
        let version = release_version(ctx, &self.0, &dir)?;

        let mut paths = vec![relative(&dir, &self.0.manifest_path(&dir)?)];
        let changelog_path = self.0.changelog_path(&dir);
        if changelog_path.exists() {
            paths.push(relative(&dir, &changelog_path));
        }
        let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
        git::add(&dir, &paths)?;

        if git::has_staged_changes(&dir) {
            git::commit(&dir, &format!("chore: release version v{}", version))?;
        } else {
            title.output("Nothing to commit");
        }

        let tag = self.0.tag_name(&version);
        if git::tag_exists_locally(&dir, &tag) {
            let tag_commit = git::get_tag_commit(&dir, &tag)?;
            let head_commit = git::get_head_commit(&dir)?;
            if tag_commit != head_commit {
                return Err(Error::validation_invalid_argument(
                    "tag",
                    format!("Tag '{}' exists but points to different commit", tag),
                    Some(tag.clone()),
                    None,
                )
                .with_hint(format!("Delete stale tag: git tag -d {}", tag)));
            }
            title.output(&format!("Reusing tag {}", tag));
        } else {
            git::create_tag(&dir, &tag, &tag)?;
        }

        ctx.set("tag", tag);
        Ok(())
    }
}

struct PushStep(Rc<ReleaseConfig>);

impl StepTask for PushStep {
    fn run(&self, ctx: &mut Context, title: &mut TitleHandle<'_>) -> Result<()> {
        let dir = project_dir(ctx)?;
        let branch = match &self.0.branch {
            Some(branch) => branch.clone(),
            None => git::current_branch(&dir)?,
        };

        title.output(&format!("git push {} {} --tags", self.0.remote, branch));
        git::push(&dir, &self.0.remote, &branch, true)
    }
}

struct GithubReleaseStep(Rc<ReleaseConfig>);

impl StepTask for GithubReleaseStep {
    fn run(&self, ctx: &mut Context, title: &mut TitleHandle<'_>) -> Result<()> {
        let dir = project_dir(ctx)?;
        let token = ctx.require_str("ghtoken")?.to_string();
        let version = release_version(ctx, &self.0, &dir)?;
        let tag = ctx
            .str("tag")
            .map(str::to_string)
            .unwrap_or_else(|| self.0.tag_name(&version));

        let repo = resolve_repo(&self.0, &dir).ok_or_else(|| {
            Error::config_invalid_value(
                "github.repo",
                None,
                "Cannot determine the GitHub repository from config, remote or manifest",
            )
        })?;

        let body = match ctx.str("changelog_notes") {
            Some(notes) => notes.to_string(),
            None => io::read_file_optional(&self.0.changelog_path(&dir), "read changelog")?
                .and_then(|content| changelog::extract_latest_notes(&content))
                .unwrap_or_default(),
        };

        let request = ReleaseRequest {
            tag_name: tag.clone(),
            name: tag,
            body,
            prerelease: version::is_prerelease(&version),
        };
        let created =
            GithubClient::new(&self.0.github.api_url, &token).create_release(&repo, &request)?;

        title.append(&format!(": {}", repo));
        ctx.set("release_url", created.html_url);
        Ok(())
    }
}
