//! The JSON envelope printed on stdout and the exit code that goes with it.

use serde::Serialize;
use slipway::error::Hint;
use slipway::{Error, ErrorCode, Result};

#[derive(Debug, Serialize)]
struct CliResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<CliError>,
}

#[derive(Debug, Serialize)]
struct CliError {
    code: String,
    message: String,
    details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    hints: Option<Vec<Hint>>,
}

impl CliResponse {
    fn success(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(CliError {
                code: err.code.as_str().to_string(),
                message: err.message.clone(),
                details: err.details.clone(),
                hints: if err.hints.is_empty() {
                    None
                } else {
                    Some(err.hints.clone())
                },
            }),
        }
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize response".to_string()))
        })
    }
}

/// Print the envelope for a command result. A closed stdout is not an error.
pub fn print_json_result(result: Result<serde_json::Value>) -> Result<()> {
    use std::io::{self, Write};

    let response = match result {
        Ok(data) => CliResponse::success(data),
        Err(err) => CliResponse::from_error(&err),
    };
    let payload = response.to_json()?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", payload) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(()); // Exit gracefully on SIGPIPE
        }
        return Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        ));
    }
    Ok(())
}

pub fn map_cmd_result_to_json<T: Serialize>(
    result: Result<(T, i32)>,
) -> (Result<serde_json::Value>, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(err) => (
                Err(Error::internal_json(
                    err.to_string(),
                    Some("serialize response".to_string()),
                )),
                1,
            ),
        },
        Err(err) => {
            let exit_code = exit_code_for_error(err.code);
            (Err(err), exit_code)
        }
    }
}

fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::ConfigInvalidJson
        | ErrorCode::ValidationMissingArgument
        | ErrorCode::ValidationInvalidArgument
        | ErrorCode::ValidationInvalidJson => 2,

        ErrorCode::ToolMissing
        | ErrorCode::ToolOutdated
        | ErrorCode::ToolVersionUnreadable
        | ErrorCode::NotAuthenticated
        | ErrorCode::InvalidSource => 10,

        ErrorCode::DestUnwritable
        | ErrorCode::RepoInitFailed
        | ErrorCode::AppProvisionFailed
        | ErrorCode::PullFailed
        | ErrorCode::SyncFailed
        | ErrorCode::MarkerWriteFailed
        | ErrorCode::CommitFailed
        | ErrorCode::PublishFailed => 20,

        ErrorCode::InternalIoError
        | ErrorCode::InternalJsonError
        | ErrorCode::InternalUnexpected => 1,
    }
}
