use std::path::PathBuf;

use crate::engine::{Context, Gate};
use crate::error::{Error, Result};
use crate::git;

pub(crate) fn project_dir(ctx: &Context) -> Result<PathBuf> {
    ctx.require_str("project_dir").map(PathBuf::from)
}

/// Checks run once before the first release step, in this order.
pub fn release_gate() -> Gate {
    Gate::new()
        .with_fn("git repository", |ctx| {
            let dir = project_dir(ctx)?;
            if git::is_git_repo(&dir) {
                Ok(())
            } else {
                Err(Error::precondition_failed(
                    "git_repository",
                    format!("Not a git repository: {}", dir.display()),
                ))
            }
        })
        .with_fn("clean working tree", |ctx| {
            let dir = project_dir(ctx)?;
            if git::is_workdir_clean(&dir) {
                Ok(())
            } else {
                Err(
                    Error::precondition_failed("clean_working_tree", "Dirty git repo, aborting")
                        .with_hint("Commit or stash your changes before releasing"),
                )
            }
        })
        .with_fn("GitHub token", |ctx| {
            let has_token = ctx.str("ghtoken").is_some_and(|t| !t.trim().is_empty());
            if !ctx.flag("ghrelease") || has_token {
                Ok(())
            } else {
                Err(
                    Error::precondition_failed("github_token", "Missing GitHub access token")
                        .with_hint("Pass --ghtoken or set GH_TOKEN"),
                )
            }
        })
}
