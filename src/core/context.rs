//! Deployment inputs and the immutable context every step reads.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::defaults::PlatformSettings;
use crate::error::Result;
use crate::paths;
use crate::utils::validation;

/// Paths and files that are never mirrored into the deployment copy.
pub const BUILTIN_EXCLUDES: &[&str] = &[
    ".DS_Store",
    "node_modules",
    ".git",
    ".gitignore",
    ".nodemonignore",
    "npm-debug.log",
];

/// Caller-supplied configuration for one deploy.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeployConfig {
    #[serde(default, alias = "src")]
    pub source_path: String,
    #[serde(default, alias = "dest")]
    pub dest_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_app_region: Option<String>,
    #[serde(default, alias = "excludePatterns", skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

/// Ambient facts about the operator's machine, resolved once by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub deployer: String,
    pub credentials_path: PathBuf,
    pub started_at: DateTime<Utc>,
}

impl Environment {
    /// Read `$USER` (falling back to `Anon`), expand the configured credentials
    /// file, and take the current time as the deploy's start.
    pub fn from_process(platform: &PlatformSettings) -> Result<Self> {
        let deployer = std::env::var("USER")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| "Anon".to_string());

        Ok(Self {
            deployer,
            credentials_path: paths::absolutize(&platform.credentials_file)?,
            started_at: Utc::now(),
        })
    }

    /// Point at a different credentials file (`~` is expanded, relative paths resolved).
    pub fn with_credentials_file(mut self, raw: &str) -> Result<Self> {
        self.credentials_path = paths::absolutize(raw)?;
        Ok(self)
    }
}

#[derive(Debug, Clone)]
pub struct DeploymentContext {
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub new_app_region: Option<String>,
    pub exclude_patterns: Vec<String>,
    pub deployer: String,
    pub credentials_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub platform: PlatformSettings,
}

impl DeploymentContext {
    pub fn resolve(
        config: &DeployConfig,
        environment: &Environment,
        platform: PlatformSettings,
        extra_excludes: &[String],
    ) -> Result<Self> {
        let source = validation::require_non_empty(
            &config.source_path,
            "sourcePath",
            "A source directory is required",
        )?;
        let dest = validation::require_non_empty(
            &config.dest_path,
            "destPath",
            "A destination directory is required",
        )?;

        let new_app_region = config
            .new_app_region
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        let mut user_excludes = config.exclude.clone();
        user_excludes.extend(extra_excludes.iter().cloned());

        Ok(Self {
            source_path: paths::absolutize(source)?,
            dest_path: paths::absolutize(dest)?,
            new_app_region,
            exclude_patterns: merge_excludes(&user_excludes),
            deployer: environment.deployer.clone(),
            credentials_path: environment.credentials_path.clone(),
            started_at: environment.started_at,
            platform,
        })
    }

    pub fn marker_path(&self) -> PathBuf {
        self.dest_path.join(&self.platform.marker_file)
    }

    pub fn source(&self) -> &Path {
        &self.source_path
    }

    pub fn dest(&self) -> &Path {
        &self.dest_path
    }
}

/// Union of user patterns and [`BUILTIN_EXCLUDES`], user order first, without duplicates.
pub fn merge_excludes(user: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(user.len() + BUILTIN_EXCLUDES.len());
    let candidates = user
        .iter()
        .map(|p| p.trim())
        .chain(BUILTIN_EXCLUDES.iter().copied());

    for pattern in candidates {
        if !pattern.is_empty() && !merged.iter().any(|m| m == pattern) {
            merged.push(pattern.to_string());
        }
    }
    merged
}

/// JSON-friendly view of a resolved context, echoed back in reports.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextSummary {
    pub source_path: String,
    pub dest_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_app_region: Option<String>,
    pub exclude_patterns: Vec<String>,
    pub deployer: String,
    pub started_at: String,
}

impl From<&DeploymentContext> for ContextSummary {
    fn from(ctx: &DeploymentContext) -> Self {
        Self {
            source_path: ctx.source_path.display().to_string(),
            dest_path: ctx.dest_path.display().to_string(),
            new_app_region: ctx.new_app_region.clone(),
            exclude_patterns: ctx.exclude_patterns.clone(),
            deployer: ctx.deployer.clone(),
            started_at: ctx.started_at.to_rfc3339(),
        }
    }
}
