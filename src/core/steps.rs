//! The deployment step catalog.
//!
//! Each step is a plain function over [`StepEnv`]. Steps 1 to 4 only observe;
//! the rest converge the destination and the remote platform toward the source.

use std::fs;
use std::path::Path;

use chrono::SecondsFormat;
use semver::Version;

use crate::error::{Error, Result};
use crate::git::{self, CommitOutcome};
use crate::pipeline::{Step, StepEnv, StepOutcome, TraceEvent};
use crate::platform::{self, UNKNOWN_APP};
use crate::process::Invocation;
use crate::sync;
use crate::utils::{command, io};

pub const TOOL_PRESENT: Step = Step {
    id: "tool-present",
    label: "Checking for the platform CLI tool",
    mutates: false,
    run: tool_present,
};

pub const TOOL_VERSION: Step = Step {
    id: "tool-version",
    label: "Checking the platform CLI tool version",
    mutates: false,
    run: tool_version,
};

pub const AUTH: Step = Step {
    id: "auth",
    label: "Checking platform authentication",
    mutates: false,
    run: auth,
};

pub const SOURCE: Step = Step {
    id: "source",
    label: "Validating the src folder",
    mutates: false,
    run: source,
};

pub const DEST: Step = Step {
    id: "dest",
    label: "Preparing the dest folder",
    mutates: true,
    run: dest,
};

pub const REPO: Step = Step {
    id: "repo",
    label: "Checking for a Git repo in the dest folder",
    mutates: true,
    run: repo,
};

pub const APP: Step = Step {
    id: "app",
    label: "Checking for a remote app",
    mutates: true,
    run: app,
};

pub const PULL: Step = Step {
    id: "pull",
    label: "Pulling the latest deployed copy",
    mutates: true,
    run: pull,
};

pub const SYNC: Step = Step {
    id: "sync",
    label: "Syncing src files to dest",
    mutates: true,
    run: sync_files,
};

pub const MARKER: Step = Step {
    id: "marker",
    label: "Stamping the deployment marker",
    mutates: true,
    run: marker,
};

pub const COMMIT: Step = Step {
    id: "commit",
    label: "Adding and committing changes",
    mutates: true,
    run: commit,
};

pub const PUBLISH: Step = Step {
    id: "publish",
    label: "Pushing to the platform",
    mutates: true,
    run: publish,
};

/// Full deployment, in the only order that works.
pub fn deploy_steps() -> Vec<Step> {
    vec![
        TOOL_PRESENT,
        TOOL_VERSION,
        AUTH,
        SOURCE,
        DEST,
        REPO,
        APP,
        PULL,
        SYNC,
        MARKER,
        COMMIT,
        PUBLISH,
    ]
}

/// The read-only prefix of [`deploy_steps`].
pub fn preflight_steps() -> Vec<Step> {
    deploy_steps().into_iter().take_while(|s| !s.mutates).collect()
}

// ============================================================================
// Preflight
// ============================================================================

fn locate_command(tool: &str) -> Invocation {
    if cfg!(windows) {
        Invocation::new("where", [tool])
    } else {
        Invocation::new("which", [tool])
    }
}

fn tool_present(env: &mut StepEnv<'_>) -> Result<StepOutcome> {
    let tool = &env.ctx.platform.cli_tool;
    let output = env.runner.run(&locate_command(tool));
    if !output.success {
        return Err(Error::tool_missing(tool, &command::error_text(&output)));
    }

    match output.stdout.lines().map(str::trim).find(|l| !l.is_empty()) {
        Some(location) => Ok(StepOutcome::done_with(location.to_string())),
        None => Ok(StepOutcome::done()),
    }
}

fn tool_version(env: &mut StepEnv<'_>) -> Result<StepOutcome> {
    let platform = &env.ctx.platform;
    let tool = platform.cli_tool.as_str();
    let minimum_raw = platform.min_cli_version.as_str();

    let minimum = Version::parse(minimum_raw).map_err(|e| {
        Error::validation_invalid_argument(
            "min_cli_version",
            format!("'{}' is not a semantic version: {}", minimum_raw, e),
            None,
            None,
        )
    })?;

    let output = env.runner.run(&Invocation::new(tool, ["--version"]));
    if !output.success {
        return Err(Error::tool_version_unreadable(
            tool,
            minimum_raw,
            command::error_text(&output),
        ));
    }

    let installed = platform::parse_cli_version(&output.stdout)
        .map_err(|e| Error::tool_version_unreadable(tool, minimum_raw, e.to_string()))?;

    if !platform::meets_minimum(&installed, &minimum) {
        return Err(Error::tool_outdated(
            tool,
            &installed.to_string(),
            minimum_raw,
        ));
    }

    Ok(StepOutcome::done_with(installed.to_string()))
}

fn auth(env: &mut StepEnv<'_>) -> Result<StepOutcome> {
    let platform = &env.ctx.platform;
    let path = &env.ctx.credentials_path;
    let shown = path.display().to_string();

    let credentials = io::read_file(path, "read credentials").map_err(|e| {
        let cause = e.details["error"].as_str().unwrap_or_default().to_string();
        Error::not_authenticated(
            format!(
                "Can't read {}. Unable to determine auth status. {}",
                shown, cause
            )
            .trim_end()
            .to_string(),
            &shown,
            &platform.cli_tool,
        )
    })?;

    if !platform::has_session_marker(&credentials, &platform.auth_hosts) {
        return Err(Error::not_authenticated(
            format!(
                "You don't appear to be authenticated with the {} CLI tool.",
                platform.cli_tool
            ),
            &shown,
            &platform.cli_tool,
        ));
    }

    Ok(StepOutcome::done())
}

/// Every reason `source` cannot be deployed; empty when it can.
pub fn unmet_source_preconditions(
    source: &Path,
    manifest: &str,
    process_file: &str,
) -> Vec<String> {
    if !source.exists() {
        return vec![format!("{} does not exist", source.display())];
    }
    if !source.is_dir() {
        return vec![format!("{} is not a directory", source.display())];
    }

    [manifest, process_file]
        .iter()
        .filter(|name| !source.join(name).is_file())
        .map(|name| format!("missing {}", name))
        .collect()
}

fn source(env: &mut StepEnv<'_>) -> Result<StepOutcome> {
    let ctx = env.ctx;
    let unmet = unmet_source_preconditions(
        ctx.source(),
        &ctx.platform.manifest_file,
        &ctx.platform.process_file,
    );
    if !unmet.is_empty() {
        return Err(Error::invalid_source(
            &ctx.source().display().to_string(),
            unmet,
        ));
    }
    Ok(StepOutcome::done_with(ctx.source().display().to_string()))
}

// ============================================================================
// Destination
// ============================================================================

fn dest(env: &mut StepEnv<'_>) -> Result<StepOutcome> {
    let path = env.ctx.dest();
    let shown = path.display().to_string();

    if path.is_dir() {
        return Ok(StepOutcome::skipped("already exists"));
    }
    if path.exists() {
        return Err(Error::dest_unwritable(&shown, "path exists but is not a directory"));
    }

    fs::create_dir_all(path).map_err(|e| Error::dest_unwritable(&shown, e.to_string()))?;
    Ok(StepOutcome::done_with("created"))
}

fn repo(env: &mut StepEnv<'_>) -> Result<StepOutcome> {
    let dir = env.ctx.dest();
    if git::is_repo_root(env.runner, dir) {
        return Ok(StepOutcome::skipped("already a Git repo"));
    }

    git::init_with_initial_commit(env.runner, dir, &env.ctx.platform.initial_commit_message)?;
    Ok(StepOutcome::done_with("initialized"))
}

/// `heroku create` arguments, with the region only when one was asked for.
pub fn create_app_args(region: Option<&str>) -> Vec<String> {
    let mut args = vec!["create".to_string()];
    if let Some(region) = region {
        args.push("--region".to_string());
        args.push(region.to_string());
    }
    args
}

fn app(env: &mut StepEnv<'_>) -> Result<StepOutcome> {
    let ctx = env.ctx;
    let tool = ctx.platform.cli_tool.as_str();
    let dir = ctx.dest();

    let info = env.runner.run(&Invocation::new(tool, ["info"]).in_dir(dir));
    if info.success {
        let name = platform::parse_app_info_name(&info.stdout).unwrap_or_else(|| {
            env.trace.emit(TraceEvent::Note {
                message: "Unrecognized app info output; continuing with the linked app".to_string(),
            });
            UNKNOWN_APP.to_string()
        });
        return Ok(StepOutcome::skipped(format!("using existing app {}", name)));
    }

    let create = Invocation::new(tool, create_app_args(ctx.new_app_region.as_deref())).in_dir(dir);
    let output = env.runner.run(&create);
    if !output.success {
        return Err(Error::app_provision_failed(command::failure_details(
            &create, &output,
        )));
    }

    // Some CLI versions print the banner on stderr.
    let combined = format!("{}\n{}", output.stdout, output.stderr);
    let name = platform::parse_created_app_name(&combined).unwrap_or_else(|| {
        env.trace.emit(TraceEvent::Note {
            message: "App created, but its name was not found in the CLI output".to_string(),
        });
        UNKNOWN_APP.to_string()
    });
    Ok(StepOutcome::done_with(format!("created app {}", name)))
}

fn pull(env: &mut StepEnv<'_>) -> Result<StepOutcome> {
    let ctx = env.ctx;
    let remote = ctx.platform.git_remote.as_str();

    if !git::has_remote_branches(env.runner, ctx.dest(), remote)? {
        return Ok(StepOutcome::skipped("nothing deployed yet"));
    }

    git::pull(env.runner, ctx.dest(), remote, &ctx.platform.deploy_branch)?;
    Ok(StepOutcome::done())
}

fn sync_files(env: &mut StepEnv<'_>) -> Result<StepOutcome> {
    let ctx = env.ctx;
    sync::mirror(env.runner, ctx.source(), ctx.dest(), &ctx.exclude_patterns)?;
    Ok(StepOutcome::done())
}

/// The single line written to the marker file.
pub fn marker_line(deployer: &str, timestamp: &str) -> String {
    format!("Deployed by {} at {} using Slipway.", deployer, timestamp)
}

fn marker(env: &mut StepEnv<'_>) -> Result<StepOutcome> {
    let ctx = env.ctx;
    let path = ctx.marker_path();
    let timestamp = ctx.started_at.to_rfc3339_opts(SecondsFormat::Millis, true);

    fs::write(&path, marker_line(&ctx.deployer, &timestamp))
        .map_err(|e| Error::marker_write_failed(&path.display().to_string(), e.to_string()))?;
    Ok(StepOutcome::done_with(timestamp))
}

fn commit(env: &mut StepEnv<'_>) -> Result<StepOutcome> {
    let ctx = env.ctx;
    match git::add_and_commit(env.runner, ctx.dest(), &ctx.platform.deploy_commit_message)? {
        CommitOutcome::Committed => Ok(StepOutcome::done()),
        CommitOutcome::NothingToCommit => Ok(StepOutcome::skipped("nothing to commit")),
    }
}

fn publish(env: &mut StepEnv<'_>) -> Result<StepOutcome> {
    let ctx = env.ctx;
    let runner = env.runner;
    let trace = &mut *env.trace;

    git::push_streaming(
        runner,
        ctx.dest(),
        &ctx.platform.git_remote,
        &ctx.platform.deploy_branch,
        &mut |stream, text| {
            trace.emit(TraceEvent::Output {
                stream,
                text: text.to_string(),
            })
        },
    )?;
    Ok(StepOutcome::done())
}
