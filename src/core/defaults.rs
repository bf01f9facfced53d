use serde::{Deserialize, Serialize};
use std::fs;

use crate::paths;

/// Root configuration structure for slipway.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SlipwayConfig {
    #[serde(default)]
    pub defaults: Defaults,
}

/// All configurable defaults that can be overridden via slipway.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default)]
    pub platform: PlatformSettings,

    /// Extra exclusion patterns applied to every deploy, on top of the built-ins.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            platform: PlatformSettings::default(),
            exclude: Vec::new(),
        }
    }
}

/// How to talk to the remote platform and what a deployable app looks like.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlatformSettings {
    #[serde(default = "default_cli_tool")]
    pub cli_tool: String,

    #[serde(default = "default_min_cli_version")]
    pub min_cli_version: String,

    /// Any of these substrings in the credentials file counts as a session.
    #[serde(default = "default_auth_hosts")]
    pub auth_hosts: Vec<String>,

    #[serde(default = "default_credentials_file")]
    pub credentials_file: String,

    #[serde(default = "default_git_remote")]
    pub git_remote: String,

    #[serde(default = "default_deploy_branch")]
    pub deploy_branch: String,

    #[serde(default = "default_manifest_file")]
    pub manifest_file: String,

    #[serde(default = "default_process_file")]
    pub process_file: String,

    #[serde(default = "default_marker_file")]
    pub marker_file: String,

    #[serde(default = "default_initial_commit_message")]
    pub initial_commit_message: String,

    #[serde(default = "default_deploy_commit_message")]
    pub deploy_commit_message: String,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            cli_tool: default_cli_tool(),
            min_cli_version: default_min_cli_version(),
            auth_hosts: default_auth_hosts(),
            credentials_file: default_credentials_file(),
            git_remote: default_git_remote(),
            deploy_branch: default_deploy_branch(),
            manifest_file: default_manifest_file(),
            process_file: default_process_file(),
            marker_file: default_marker_file(),
            initial_commit_message: default_initial_commit_message(),
            deploy_commit_message: default_deploy_commit_message(),
        }
    }
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_cli_tool() -> String {
    "heroku".to_string()
}

fn default_min_cli_version() -> String {
    "2.39.2".to_string()
}

fn default_auth_hosts() -> Vec<String> {
    vec!["code.heroku.com".to_string(), "api.heroku.com".to_string()]
}

fn default_credentials_file() -> String {
    "~/.netrc".to_string()
}

fn default_git_remote() -> String {
    "heroku".to_string()
}

fn default_deploy_branch() -> String {
    "master".to_string()
}

fn default_manifest_file() -> String {
    "package.json".to_string()
}

fn default_process_file() -> String {
    "Procfile".to_string()
}

fn default_marker_file() -> String {
    "deployment-info".to_string()
}

fn default_initial_commit_message() -> String {
    "Initial commit.".to_string()
}

fn default_deploy_commit_message() -> String {
    "Slipway deployment.".to_string()
}

// =============================================================================
// Loading functions
// =============================================================================

/// Load defaults, merging file config with built-in defaults.
/// If slipway.json is missing or invalid, silently returns built-in defaults.
pub fn load_defaults() -> Defaults {
    load_config().defaults
}

/// Load the full slipway.json config, falling back to defaults on any error.
pub fn load_config() -> SlipwayConfig {
    load_config_from_file().unwrap_or_default()
}

/// Attempt to load config from slipway.json file.
fn load_config_from_file() -> crate::Result<SlipwayConfig> {
    let path = paths::slipway_json()?;

    if !path.exists() {
        return Err(crate::Error::other("slipway.json not found"));
    }

    let content = fs::read_to_string(&path).map_err(|e| {
        crate::Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
    })?;

    parse_config(&content)
        .map_err(|e| crate::Error::config_invalid_json(path.display().to_string(), e))
}

fn parse_config(content: &str) -> std::result::Result<SlipwayConfig, serde_json::Error> {
    serde_json::from_str(content)
}

/// Check if slipway.json file exists
pub fn config_exists() -> bool {
    paths::slipway_json()
        .map(|p| p.exists())
        .unwrap_or(false)
}

/// Delete slipway.json file (reset to defaults)
pub fn reset_config() -> crate::Result<bool> {
    let path = paths::slipway_json()?;

    if path.exists() {
        fs::remove_file(&path).map_err(|e| {
            crate::Error::internal_io(e.to_string(), Some(format!("delete {}", path.display())))
        })?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Get the path to slipway.json (for display purposes)
pub fn config_path() -> crate::Result<String> {
    Ok(paths::slipway_json()?.display().to_string())
}

/// Get built-in defaults (ignoring any file config)
pub fn builtin_defaults() -> Defaults {
    Defaults::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_builtin_platform() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.defaults.platform, PlatformSettings::default());
        assert!(config.defaults.exclude.is_empty());
    }

    #[test]
    fn partial_platform_override_keeps_other_defaults() {
        let config = parse_config(
            r#"{"defaults":{"platform":{"deploy_branch":"main","min_cli_version":"7.0.0"},"exclude":["*.log"]}}"#,
        )
        .unwrap();
        let platform = config.defaults.platform;
        assert_eq!(platform.deploy_branch, "main");
        assert_eq!(platform.min_cli_version, "7.0.0");
        assert_eq!(platform.cli_tool, "heroku");
        assert_eq!(platform.process_file, "Procfile");
        assert_eq!(config.defaults.exclude, vec!["*.log".to_string()]);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_config("{ not json").is_err());
    }
}
