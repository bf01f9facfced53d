//! Parsing and decisions around the remote platform CLI.
//!
//! The CLI only offers free-form text, so each extraction lives in its own
//! small function with a named failure.

use std::cmp::Ordering;

use regex::Regex;
use semver::Version;

/// Placeholder shown when the CLI succeeded but its output has no recognizable app name.
pub const UNKNOWN_APP: &str = "[unknown app]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    /// The CLI printed nothing.
    Empty,
    /// No `<name>/<version>` token on the first line.
    NoVersionToken,
    /// A token was found but it is not a semantic version.
    NotSemver(String),
}

impl std::fmt::Display for VersionParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionParseError::Empty => write!(f, "The version command printed nothing."),
            VersionParseError::NoVersionToken => {
                write!(f, "No '<name>/<version>' token in the version output.")
            }
            VersionParseError::NotSemver(token) => {
                write!(f, "'{}' is not a semantic version.", token)
            }
        }
    }
}

/// Extract the version from output like `heroku/7.60.1 linux-x64 node-v14.19.0`.
///
/// Takes the first whitespace-delimited word, then the text after its first `/`.
/// A leading `v` is tolerated.
pub fn parse_cli_version(output: &str) -> Result<Version, VersionParseError> {
    let first_line = output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or(VersionParseError::Empty)?;

    let first_word = first_line.split_whitespace().next().unwrap_or_default();
    let token = first_word
        .split_once('/')
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
        .ok_or(VersionParseError::NoVersionToken)?;

    let candidate = token.strip_prefix('v').unwrap_or(token);
    Version::parse(candidate).map_err(|_| VersionParseError::NotSemver(token.to_string()))
}

/// Order by major.minor.patch; pre-release and build metadata only break ties.
pub fn compare_versions(a: &Version, b: &Version) -> Ordering {
    (a.major, a.minor, a.patch)
        .cmp(&(b.major, b.minor, b.patch))
        .then_with(|| a.cmp(b))
}

pub fn meets_minimum(installed: &Version, minimum: &Version) -> bool {
    compare_versions(installed, minimum) != Ordering::Less
}

/// App name from `heroku create` output.
///
/// Understands the classic `Creating <name>... done, stack is ...` line and the
/// newer `Creating app... done, ⬢ <name>` form.
pub fn parse_created_app_name(output: &str) -> Option<String> {
    let modern = Regex::new(r"Creating app\.\.\. done, ⬢ (\S+)").ok()?;
    if let Some(name) = modern.captures(output).and_then(|caps| caps.get(1)) {
        return Some(name.as_str().to_string());
    }

    let classic = Regex::new(r"Creating\s+(?:app\s+)?(\S+?)\.\.\.\s").ok()?;
    classic
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|name| name != "app")
}

/// App name from the `=== <name>` header that opens `heroku info` output.
pub fn parse_app_info_name(output: &str) -> Option<String> {
    let first_line = output.lines().next()?;
    let name = first_line.split_once("=== ")?.1.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// True when the credentials text mentions any of the platform's hosts.
pub fn has_session_marker(credentials: &str, hosts: &[String]) -> bool {
    hosts
        .iter()
        .filter(|h| !h.trim().is_empty())
        .any(|host| credentials.contains(host.trim()))
}
