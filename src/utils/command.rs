//! Helpers for turning captured process output into diagnostics.

use crate::error::ToolFailureDetails;
use crate::process::{CommandOutput, Invocation};

/// Extract error text from command output.
///
/// Prefers stderr, falls back to stdout if stderr is empty.
pub fn error_text(output: &CommandOutput) -> String {
    if !output.stderr.trim().is_empty() {
        output.stderr.trim().to_string()
    } else {
        output.stdout.trim().to_string()
    }
}

/// True when either stream mentions `needle`.
pub fn mentions(output: &CommandOutput, needle: &str) -> bool {
    output.stdout.contains(needle) || output.stderr.contains(needle)
}

/// Package a failed invocation for an error's `details`.
pub fn failure_details(invocation: &Invocation, output: &CommandOutput) -> ToolFailureDetails {
    ToolFailureDetails {
        command: invocation.display(),
        exit_code: output.exit_code,
        stdout: output.stdout.trim().to_string(),
        stderr: output.stderr.trim().to_string(),
    }
}
