//! Command execution primitives with consistent error handling.

use std::path::Path;
use std::process::{Command, Output};

use serde::Serialize;

use crate::error::{Error, Result, StepCommandFailedDetails};

/// Captured output from a shell command.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShellOutput {
    pub command: String,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
}

/// Run a program in a directory, returning None on failure or empty output.
///
/// Useful when command failure is expected (e.g. looking up an optional tag).
pub fn run_in_optional(dir: &Path, program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program)
        .args(args)
        .current_dir(dir)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        None
    } else {
        Some(stdout)
    }
}

/// Check if a command succeeds in a directory without capturing output.
pub fn succeeded_in(dir: &Path, program: &str, args: &[&str]) -> bool {
    Command::new(program)
        .args(args)
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run a shell command line (`sh -c`) in a directory.
///
/// A non-zero exit is a `step.command_failed` error carrying the captured
/// output.
pub fn run_shell_in(dir: &Path, command: &str) -> Result<ShellOutput> {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    let output = cmd.current_dir(dir).output().map_err(|e| {
        Error::internal_io(
            format!("Failed to spawn '{}': {}", command, e),
            Some("run shell command".to_string()),
        )
    })?;

    let result = ShellOutput {
        command: command.to_string(),
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    };

    if !output.status.success() {
        return Err(Error::step_command_failed(StepCommandFailedDetails {
            command: result.command,
            exit_code: result.exit_code,
            stdout: result.stdout,
            stderr: result.stderr,
        }));
    }

    Ok(result)
}

/// Extract error text from command output.
///
/// Prefers stderr, falls back to stdout if stderr is empty.
pub fn error_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        stderr.trim().to_string()
    } else {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_in_optional_returns_trimmed_stdout() {
        let result = run_in_optional(Path::new("."), "echo", &["hello"]);
        assert_eq!(result.as_deref(), Some("hello"));
    }

    #[test]
    fn succeeded_in_is_false_for_missing_program() {
        assert!(!succeeded_in(Path::new("."), "nonexistent_command_xyz", &[]));
    }

    #[test]
    fn run_in_optional_returns_none_on_failure() {
        let result = run_in_optional(Path::new("/tmp"), "false", &[]);
        assert!(result.is_none());
    }

    #[test]
    fn error_text_prefers_stderr() {
        let output = Output {
            status: std::process::ExitStatus::default(),
            stdout: b"stdout content".to_vec(),
            stderr: b"stderr content".to_vec(),
        };
        assert_eq!(error_text(&output), "stderr content");
    }

    #[test]
    fn error_text_falls_back_to_stdout() {
        let output = Output {
            status: std::process::ExitStatus::default(),
            stdout: b"stdout content".to_vec(),
            stderr: b"".to_vec(),
        };
        assert_eq!(error_text(&output), "stdout content");
    }

    #[cfg(not(windows))]
    #[test]
    fn run_shell_in_captures_stdout() {
        let output = run_shell_in(Path::new("."), "echo linted").unwrap();
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout.trim(), "linted");
    }

    #[cfg(not(windows))]
    #[test]
    fn run_shell_in_reports_non_zero_exit() {
        let err = run_shell_in(Path::new("."), "echo 'tests failed' >&2; exit 3").unwrap_err();
        assert_eq!(err.code.as_str(), "step.command_failed");
        assert_eq!(err.details["exitCode"], 3);
        assert_eq!(err.details["stderr"].as_str().map(str::trim), Some("tests failed"));
    }
}
