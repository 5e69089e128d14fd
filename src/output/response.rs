//! CLI response formatting and output.
//!
//! Provides JSON envelope, printing, and exit code mapping.

use relman::error::Hint;
use relman::{Error, ErrorCode, Result};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<Hint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl<T: Serialize> CliResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize response".to_string()))
        })
    }
}

impl CliError {
    fn from_error(err: &Error) -> Self {
        Self {
            code: err.code.as_str().to_string(),
            message: err.message.clone(),
            details: err.details.clone(),
            hints: if err.hints.is_empty() {
                None
            } else {
                Some(err.hints.clone())
            },
            retryable: err.retryable,
        }
    }
}

/// JSON payload of a command, or how it failed.
pub type JsonResult = std::result::Result<serde_json::Value, CmdFailure>;

/// A failed command: its error plus any output produced before it failed.
#[derive(Debug)]
pub struct CmdFailure {
    pub error: Error,
    pub partial: Option<serde_json::Value>,
}

impl CmdFailure {
    /// Attach partial output. Output that cannot be serialized is dropped so
    /// the original error still reaches the caller.
    pub fn with_partial<T: Serialize>(error: Error, partial: &T) -> Self {
        Self {
            error,
            partial: serde_json::to_value(partial).ok(),
        }
    }
}

impl From<Error> for CmdFailure {
    fn from(error: Error) -> Self {
        Self {
            error,
            partial: None,
        }
    }
}

impl CliResponse<serde_json::Value> {
    pub fn from_failure(failure: &CmdFailure) -> Self {
        Self {
            success: false,
            data: failure.partial.clone(),
            error: Some(CliError::from_error(&failure.error)),
        }
    }
}

fn print_response<T: Serialize>(response: &CliResponse<T>) -> Result<()> {
    use std::io::{self, Write};

    let payload = response.to_json()?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", payload) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        ));
    }
    Ok(())
}

pub fn map_cmd_result_to_json<T: Serialize>(
    result: std::result::Result<(T, i32), CmdFailure>,
) -> (JsonResult, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(err) => (
                Err(CmdFailure::from(Error::internal_json(
                    err.to_string(),
                    Some("serialize response".to_string()),
                ))),
                1,
            ),
        },
        Err(failure) => {
            let exit_code = exit_code_for_error(failure.error.code);
            (Err(failure), exit_code)
        }
    }
}

fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::ConfigInvalidJson
        | ErrorCode::ConfigInvalidValue
        | ErrorCode::ValidationInvalidArgument
        | ErrorCode::ManifestNotFound
        | ErrorCode::ManifestUnsupported
        | ErrorCode::ManifestInvalid => 2,

        ErrorCode::PreconditionFailed => 3,

        ErrorCode::StepCommandFailed
        | ErrorCode::GitCommandFailed
        | ErrorCode::RemoteApiFailed => 20,

        ErrorCode::InternalIoError
        | ErrorCode::InternalJsonError => 1,
    }
}

pub fn print_json_result(result: JsonResult) -> Result<()> {
    match result {
        Ok(data) => print_response(&CliResponse::success(data)),
        Err(failure) => print_response(&CliResponse::from_failure(&failure)),
    }
}
