use std::path::Path;

use super::{execute_git, git};
use crate::error::Result;
use crate::utils::command;

pub fn is_git_repo(dir: &Path) -> bool {
    command::succeeded_in(dir, "git", &["rev-parse", "--is-inside-work-tree"])
}

/// Check if a git working directory has no uncommitted changes.
///
/// A failing `git status` counts as dirty.
pub fn is_workdir_clean(dir: &Path) -> bool {
    match execute_git(dir, &["status", "--porcelain"]) {
        Ok(o) if o.status.success() => o.stdout.is_empty(),
        _ => false,
    }
}

pub fn current_branch(dir: &Path) -> Result<String> {
    git(dir, &["rev-parse", "--abbrev-ref", "HEAD"])
}

pub fn remote_url(dir: &Path, remote: &str) -> Option<String> {
    command::run_in_optional(dir, "git", &["remote", "get-url", remote])
}

pub fn add(dir: &Path, paths: &[&str]) -> Result<()> {
    let mut args = vec!["add", "--"];
    args.extend_from_slice(paths);
    git(dir, &args).map(|_| ())
}

pub fn has_staged_changes(dir: &Path) -> bool {
    !command::succeeded_in(dir, "git", &["diff", "--cached", "--quiet"])
}

/// Commit the index and return the new HEAD SHA.
pub fn commit(dir: &Path, message: &str) -> Result<String> {
    git(dir, &["commit", "-q", "-m", message])?;
    get_head_commit(dir)
}

pub fn create_tag(dir: &Path, name: &str, message: &str) -> Result<()> {
    git(dir, &["tag", "-a", name, "-m", message]).map(|_| ())
}

/// Check if a tag exists locally.
pub fn tag_exists_locally(dir: &Path, tag_name: &str) -> bool {
    command::run_in_optional(dir, "git", &["tag", "-l", tag_name]).is_some()
}

/// Get the commit SHA a tag points to.
pub fn get_tag_commit(dir: &Path, tag_name: &str) -> Result<String> {
    git(dir, &["rev-list", "-n", "1", tag_name])
}

/// Get the current HEAD commit SHA.
pub fn get_head_commit(dir: &Path) -> Result<String> {
    git(dir, &["rev-parse", "HEAD"])
}

pub fn push(dir: &Path, remote: &str, branch: &str, tags: bool) -> Result<()> {
    let mut args = vec!["push", remote, branch];
    if tags {
        args.push("--tags");
    }
    git(dir, &args)
        .map(|_| ())
        .map_err(|e| e.with_retryable(true))
}
