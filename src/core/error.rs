use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    ConfigInvalidJson,

    ValidationMissingArgument,
    ValidationInvalidArgument,
    ValidationInvalidJson,

    ToolMissing,
    ToolOutdated,
    ToolVersionUnreadable,
    NotAuthenticated,
    InvalidSource,

    DestUnwritable,
    RepoInitFailed,
    AppProvisionFailed,
    PullFailed,
    SyncFailed,
    MarkerWriteFailed,
    CommitFailed,
    PublishFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigInvalidJson => "config.invalid_json",

            ErrorCode::ValidationMissingArgument => "validation.missing_argument",
            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",
            ErrorCode::ValidationInvalidJson => "validation.invalid_json",

            ErrorCode::ToolMissing => "tool.missing",
            ErrorCode::ToolOutdated => "tool.outdated",
            ErrorCode::ToolVersionUnreadable => "tool.version_unreadable",
            ErrorCode::NotAuthenticated => "auth.not_authenticated",
            ErrorCode::InvalidSource => "source.invalid",

            ErrorCode::DestUnwritable => "dest.unwritable",
            ErrorCode::RepoInitFailed => "repo.init_failed",
            ErrorCode::AppProvisionFailed => "app.provision_failed",
            ErrorCode::PullFailed => "git.pull_failed",
            ErrorCode::SyncFailed => "sync.failed",
            ErrorCode::MarkerWriteFailed => "marker.write_failed",
            ErrorCode::CommitFailed => "git.commit_failed",
            ErrorCode::PublishFailed => "publish.failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArgumentDetails {
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalIoErrorDetails {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolVersionDetails {
    pub tool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed: Option<String>,
    pub minimum: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidSourceDetails {
    pub path: String,
    pub unmet: Vec<String>,
}

/// Captured diagnostics from a failed external tool invocation.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolFailureDetails {
    pub command: String,
    pub exit_code: i32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
}

fn to_details<T: Serialize>(details: T) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

fn empty_details() -> Value {
    Value::Object(serde_json::Map::new())
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
        }
    }

    pub fn validation_missing_argument(args: Vec<String>) -> Self {
        Self::new(
            ErrorCode::ValidationMissingArgument,
            "Missing required argument",
            to_details(MissingArgumentDetails { args }),
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let problem = problem.into();
        let details = to_details(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.clone(),
            id,
            tried,
        });

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            format!("Invalid argument: {}", problem),
            details,
        )
    }

    pub fn validation_invalid_json(
        err: serde_json::Error,
        context: Option<String>,
        input_preview: Option<String>,
    ) -> Self {
        let details = serde_json::json!({
            "error": err.to_string(),
            "context": context,
            "inputPreview": input_preview,
        });

        Self::new(ErrorCode::ValidationInvalidJson, "Invalid JSON", details)
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = serde_json::json!({
            "path": path.into(),
            "error": err.to_string(),
        });

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    // ------------------------------------------------------------------
    // Pipeline step failures
    // ------------------------------------------------------------------

    pub fn tool_missing(tool: &str, diagnostic: &str) -> Self {
        Self::new(
            ErrorCode::ToolMissing,
            format!(
                "Unable to invoke the {} CLI tool. Is it installed? {}",
                tool,
                diagnostic.trim()
            )
            .trim_end()
            .to_string(),
            serde_json::json!({ "tool": tool }),
        )
        .with_hint(format!("Install the '{}' CLI and make sure it is on PATH", tool))
    }

    pub fn tool_outdated(tool: &str, installed: &str, minimum: &str) -> Self {
        Self::new(
            ErrorCode::ToolOutdated,
            format!(
                "The installed {} CLI tool is out of date ({}). Version {} and above is required.",
                tool, installed, minimum
            ),
            to_details(ToolVersionDetails {
                tool: tool.to_string(),
                installed: Some(installed.to_string()),
                minimum: minimum.to_string(),
            }),
        )
        .with_hint(format!("Update the '{}' CLI and re-run", tool))
    }

    pub fn tool_version_unreadable(tool: &str, minimum: &str, problem: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ToolVersionUnreadable,
            format!(
                "Unable to check the {} CLI tool version. {}",
                tool,
                problem.into()
            ),
            to_details(ToolVersionDetails {
                tool: tool.to_string(),
                installed: None,
                minimum: minimum.to_string(),
            }),
        )
    }

    pub fn not_authenticated(
        message: impl Into<String>,
        credentials_path: &str,
        tool: &str,
    ) -> Self {
        Self::new(
            ErrorCode::NotAuthenticated,
            message,
            serde_json::json!({ "credentialsPath": credentials_path }),
        )
        .with_hint(format!("Try running '{} login'", tool))
    }

    pub fn invalid_source(path: &str, unmet: Vec<String>) -> Self {
        let message = format!("The src folder is not deployable: {}", unmet.join("; "));
        Self::new(
            ErrorCode::InvalidSource,
            message,
            to_details(InvalidSourceDetails {
                path: path.to_string(),
                unmet,
            }),
        )
    }

    pub fn dest_unwritable(path: &str, error: impl Into<String>) -> Self {
        let error = error.into();
        Self::new(
            ErrorCode::DestUnwritable,
            format!("Unable to prepare the dest folder {}: {}", path, error),
            serde_json::json!({ "path": path, "error": error }),
        )
    }

    pub fn repo_init_failed(details: ToolFailureDetails) -> Self {
        Self::tool_failure(
            ErrorCode::RepoInitFailed,
            "Unable to set up a Git repo in the dest folder.",
            details,
        )
    }

    pub fn app_provision_failed(details: ToolFailureDetails) -> Self {
        Self::tool_failure(
            ErrorCode::AppProvisionFailed,
            "Unable to create the app.",
            details,
        )
    }

    pub fn pull_failed(summary: &str, details: ToolFailureDetails) -> Self {
        Self::tool_failure(ErrorCode::PullFailed, summary, details)
            .with_hint("Resolve the conflict in the dest folder manually, then re-run the deploy")
    }

    pub fn sync_failed(details: ToolFailureDetails) -> Self {
        Self::tool_failure(
            ErrorCode::SyncFailed,
            "Unable to sync src files to dest.",
            details,
        )
    }

    pub fn marker_write_failed(path: &str, error: impl Into<String>) -> Self {
        let error = error.into();
        Self::new(
            ErrorCode::MarkerWriteFailed,
            format!("Unable to write the deployment marker {}: {}", path, error),
            serde_json::json!({ "path": path, "error": error }),
        )
    }

    pub fn commit_failed(details: ToolFailureDetails) -> Self {
        Self::tool_failure(
            ErrorCode::CommitFailed,
            "Unable to add and commit new files in dest.",
            details,
        )
    }

    pub fn publish_failed(details: ToolFailureDetails) -> Self {
        Self::tool_failure(
            ErrorCode::PublishFailed,
            "Error pushing to the platform git repo.",
            details,
        )
    }

    /// Builds an error whose message ends with the tool's own diagnostic text.
    fn tool_failure(code: ErrorCode, summary: &str, details: ToolFailureDetails) -> Self {
        let diagnostic = if details.stderr.trim().is_empty() {
            details.stdout.trim()
        } else {
            details.stderr.trim()
        };
        let message = if diagnostic.is_empty() {
            summary.to_string()
        } else {
            format!("{} {}", summary, diagnostic)
        };
        Self::new(code, message, to_details(details))
    }

    // ------------------------------------------------------------------
    // Internal
    // ------------------------------------------------------------------

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        Self::new(
            ErrorCode::InternalIoError,
            "IO error",
            to_details(InternalIoErrorDetails {
                error: error.into(),
                context,
            }),
        )
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = serde_json::json!({
            "error": error.into(),
            "context": context,
        });
        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        let error = error.into();
        Self::new(
            ErrorCode::InternalUnexpected,
            format!("Unexpected error: {}", error),
            empty_details(),
        )
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::internal_unexpected(message)
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(stdout: &str, stderr: &str) -> ToolFailureDetails {
        ToolFailureDetails {
            command: "git pull heroku master".to_string(),
            exit_code: 1,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn tool_failure_message_carries_stderr_verbatim() {
        let err = Error::pull_failed(
            "Can't pull from the platform.",
            failure("", "CONFLICT (content): Merge conflict in index.js\n"),
        );
        assert_eq!(err.code, ErrorCode::PullFailed);
        assert_eq!(
            err.message,
            "Can't pull from the platform. CONFLICT (content): Merge conflict in index.js"
        );
        assert_eq!(err.details["exitCode"], 1);
    }

    #[test]
    fn tool_failure_falls_back_to_stdout() {
        let err = Error::sync_failed(failure("rsync: change_dir failed", ""));
        assert_eq!(
            err.message,
            "Unable to sync src files to dest. rsync: change_dir failed"
        );
    }

    #[test]
    fn tool_failure_without_diagnostics_uses_summary() {
        let err = Error::publish_failed(failure("", "  "));
        assert_eq!(err.message, "Error pushing to the platform git repo.");
    }

    #[test]
    fn invalid_source_lists_every_unmet_precondition() {
        let err = Error::invalid_source(
            "/srv/app",
            vec!["missing package.json".to_string(), "missing Procfile".to_string()],
        );
        assert_eq!(err.code.as_str(), "source.invalid");
        assert!(err.message.contains("missing package.json; missing Procfile"));
        assert_eq!(err.details["unmet"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn not_authenticated_suggests_login() {
        let err = Error::not_authenticated("no session", "/home/me/.netrc", "heroku");
        assert_eq!(err.hints[0].message, "Try running 'heroku login'");
    }
}
