//! Full deploys against real git and rsync, with a local bare repository
//! standing in for the platform remote and a shell script for its CLI.
#![cfg(unix)]

mod common;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;

use chrono::Utc;
use common::Workspace;
use slipway::context::Environment;
use slipway::defaults::Defaults;
use slipway::deploy::{self, DeployReport};
use slipway::pipeline::{PipelineStepStatus, RecordingTrace};
use slipway::process::SystemRunner;
use slipway::ErrorCode;

fn available(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn fake_cli_script(remote: &Path) -> String {
    format!(
        r#"#!/bin/sh
case "$1" in
  --version)
    echo "heroku/7.60.1 linux-x64 node-v14.19.0"
    ;;
  info)
    if git remote get-url heroku >/dev/null 2>&1; then
      echo "=== sharp-rain-871"
      echo "Git URL: {remote}"
    else
      echo " ▸    Couldn't find that app." 1>&2
      exit 1
    fi
    ;;
  create)
    git remote add heroku "{remote}" || exit 1
    echo "Creating sharp-rain-871... done, stack is cedar"
    echo "Git remote heroku added"
    ;;
  *)
    exit 2
    ;;
esac
"#,
        remote = remote.display()
    )
}

struct Platform {
    runner: SystemRunner,
    remote: std::path::PathBuf,
}

fn platform(ws: &Workspace) -> Platform {
    let bin = ws.root.path().join("bin");
    let remote = ws.root.path().join("remote.git");
    fs::create_dir_all(&bin).unwrap();

    let status = Command::new("git")
        .args(["init", "--bare", "--quiet"])
        .arg(&remote)
        .status()
        .unwrap();
    assert!(status.success());

    let cli = bin.join("heroku");
    fs::write(&cli, fake_cli_script(&remote)).unwrap();
    fs::set_permissions(&cli, fs::Permissions::from_mode(0o755)).unwrap();

    let path = format!(
        "{}:{}",
        bin.display(),
        std::env::var("PATH").unwrap_or_default()
    );
    let runner = SystemRunner::new()
        .with_env("PATH", path)
        .with_env("GIT_AUTHOR_NAME", "Slipway Test")
        .with_env("GIT_AUTHOR_EMAIL", "slipway@example.com")
        .with_env("GIT_COMMITTER_NAME", "Slipway Test")
        .with_env("GIT_COMMITTER_EMAIL", "slipway@example.com");

    Platform { runner, remote }
}

fn deploy_once(ws: &Workspace, platform: &Platform) -> (DeployReport, RecordingTrace) {
    let environment = Environment {
        started_at: Utc::now(),
        ..ws.environment()
    };
    let mut trace = RecordingTrace::new();
    let report = deploy::run(
        &ws.config(),
        &environment,
        &Defaults::default(),
        &platform.runner,
        &mut trace,
    )
    .unwrap();
    (report, trace)
}

fn remote_log(remote: &Path) -> String {
    let output = Command::new("git")
        .arg("--git-dir")
        .arg(remote)
        .args(["log", "--format=%s", "master"])
        .output()
        .unwrap();
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn tools_missing() -> bool {
    if available("git") && available("rsync") {
        return false;
    }
    eprintln!("skipping: git and rsync are required for end-to-end deploys");
    true
}

#[test]
fn fresh_deploy_publishes_a_versioned_mirror() {
    if tools_missing() {
        return;
    }
    let ws = Workspace::new();
    fs::create_dir_all(ws.src.join("node_modules/left-pad")).unwrap();
    fs::write(ws.src.join("node_modules/left-pad/index.js"), "module.exports = 1;").unwrap();
    let platform = platform(&ws);

    let (report, _trace) = deploy_once(&ws, &platform);

    assert!(
        report.is_success(),
        "{}",
        serde_json::to_string_pretty(&report).unwrap()
    );
    for name in ["package.json", "Procfile", "index.js", "deployment-info"] {
        assert!(ws.dest.join(name).is_file(), "missing {}", name);
    }
    assert!(ws.dest.join(".git").is_dir());
    assert!(!ws.dest.join("node_modules").exists());

    let log = remote_log(&platform.remote);
    assert!(log.contains("Slipway deployment."));
    assert!(log.contains("Initial commit."));
}

#[test]
fn second_deploy_pulls_and_mirrors_deletions() {
    if tools_missing() {
        return;
    }
    let ws = Workspace::new();
    let platform = platform(&ws);

    let (first, _) = deploy_once(&ws, &platform);
    assert!(first.is_success());

    fs::remove_file(ws.src.join("index.js")).unwrap();
    fs::write(ws.src.join("server.js"), "require('http');\n").unwrap();

    let (second, _) = deploy_once(&ws, &platform);
    assert!(
        second.is_success(),
        "{}",
        serde_json::to_string_pretty(&second).unwrap()
    );

    let status = |id: &str| {
        second
            .pipeline
            .steps
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.status)
            .unwrap()
    };
    assert_eq!(status("dest"), PipelineStepStatus::Skipped);
    assert_eq!(status("repo"), PipelineStepStatus::Skipped);
    assert_eq!(status("app"), PipelineStepStatus::Skipped);
    assert_eq!(status("pull"), PipelineStepStatus::Succeeded);

    assert!(!ws.dest.join("index.js").exists());
    assert!(ws.dest.join("server.js").is_file());
    assert_eq!(remote_log(&platform.remote).matches("Slipway deployment.").count(), 2);
}

#[test]
fn unchanged_source_still_commits_and_publishes_on_redeploy() {
    if tools_missing() {
        return;
    }
    let ws = Workspace::new();
    let platform = platform(&ws);

    let (first, _) = deploy_once(&ws, &platform);
    assert!(first.is_success());

    let (second, _) = deploy_once(&ws, &platform);
    assert!(
        second.is_success(),
        "{}",
        serde_json::to_string_pretty(&second).unwrap()
    );

    let commit = second.pipeline.steps.iter().find(|s| s.id == "commit").unwrap();
    assert_eq!(commit.status, PipelineStepStatus::Succeeded);
    let publish = second.pipeline.steps.iter().find(|s| s.id == "publish").unwrap();
    assert_eq!(publish.status, PipelineStepStatus::Succeeded);
    assert_eq!(remote_log(&platform.remote).matches("Slipway deployment.").count(), 2);
}

#[test]
fn missing_cli_leaves_dest_untouched() {
    let ws = Workspace::new();
    let empty_bin = ws.root.path().join("empty-bin");
    let runner = SystemRunner::new().with_env("PATH", empty_bin.display().to_string());

    let report = deploy::run(
        &ws.config(),
        &ws.environment(),
        &Defaults::default(),
        &runner,
        &mut RecordingTrace::new(),
    )
    .unwrap();

    assert_eq!(report.pipeline.outcome.code(), Some(ErrorCode::ToolMissing));
    assert!(!ws.dest.exists());
}
