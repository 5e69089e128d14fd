mod commits;
mod operations;

pub use commits::*;
pub use operations::*;

use std::path::Path;
use std::process::{Command, Output};

use crate::error::{Error, Result};
use crate::utils::command;

fn execute_git(dir: &Path, args: &[&str]) -> Result<Output> {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| Error::git_command_failed(format!("Failed to run git: {}", e)))
}

/// Run git and return trimmed stdout; a non-zero exit is `git.command_failed`.
fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = execute_git(dir, args)?;
    if !output.status.success() {
        return Err(Error::git_command_failed(format!(
            "git {} failed: {}",
            args.join(" "),
            command::error_text(&output)
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
