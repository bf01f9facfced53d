use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::paths;
use crate::process::{CommandOutput, Invocation, ProcessRunner, StreamKind};
use crate::utils::command;

// ============================================================================
// Low-level Git Primitives (path-based, runner-injected)
// ============================================================================

fn git(dir: &Path, args: &[&str]) -> Invocation {
    Invocation::new("git", args.iter().copied()).in_dir(dir)
}

/// Get the root directory of the repository containing `dir`.
/// Returns None if `dir` is not inside a git working copy.
pub fn get_git_root(runner: &dyn ProcessRunner, dir: &Path) -> Option<PathBuf> {
    let output = runner.run(&git(dir, &["rev-parse", "--show-toplevel"]));
    if !output.success {
        return None;
    }
    let root = output.stdout.trim();
    if root.is_empty() {
        None
    } else {
        Some(PathBuf::from(root))
    }
}

/// True when `dir` is itself the top level of a working copy, not merely inside one.
pub fn is_repo_root(runner: &dyn ProcessRunner, dir: &Path) -> bool {
    get_git_root(runner, dir)
        .map(|root| paths::same_location(&root, dir))
        .unwrap_or(false)
}

/// `git init`, stage everything present, and record an initial commit.
///
/// The commit is allowed to be empty so a brand-new destination still gets a HEAD.
pub fn init_with_initial_commit(
    runner: &dyn ProcessRunner,
    dir: &Path,
    message: &str,
) -> Result<()> {
    let steps: [Invocation; 3] = [
        git(dir, &["init"]),
        git(dir, &["add", "."]),
        git(dir, &["commit", "--allow-empty", "-m", message]),
    ];

    for invocation in &steps {
        let output = runner.run(invocation);
        if !output.success {
            return Err(Error::repo_init_failed(command::failure_details(
                invocation, &output,
            )));
        }
    }
    Ok(())
}

/// Parse `git branch -av` output for remote-tracking branches of `remote`.
pub fn lists_remote_branch(branch_listing: &str, remote: &str) -> bool {
    let prefix = format!("remotes/{}/", remote);
    branch_listing
        .lines()
        .map(|line| line.trim_start_matches(['*', ' ']))
        .any(|line| line.starts_with(&prefix))
}

/// Whether anything has been pushed to (or fetched from) `remote` yet.
pub fn has_remote_branches(runner: &dyn ProcessRunner, dir: &Path, remote: &str) -> Result<bool> {
    let invocation = git(dir, &["branch", "-av"]);
    let output = runner.run(&invocation);
    if !output.success {
        return Err(Error::pull_failed(
            "Unable to determine repo status.",
            command::failure_details(&invocation, &output),
        ));
    }
    Ok(lists_remote_branch(&output.stdout, remote))
}

/// Merge the remote deployment branch into the working copy. Conflicts are left for the operator.
pub fn pull(runner: &dyn ProcessRunner, dir: &Path, remote: &str, branch: &str) -> Result<()> {
    let invocation = git(dir, &["pull", "--no-rebase", "--no-edit", remote, branch]);
    let output = runner.run(&invocation);
    if !output.success {
        return Err(Error::pull_failed(
            "Can't pull from the platform.",
            command::failure_details(&invocation, &output),
        ));
    }
    Ok(())
}

/// Outcome of [`add_and_commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    NothingToCommit,
}

/// Stage every change (including deletions) and commit.
///
/// "nothing to commit" is reported as [`CommitOutcome::NothingToCommit`], not an error.
pub fn add_and_commit(
    runner: &dyn ProcessRunner,
    dir: &Path,
    message: &str,
) -> Result<CommitOutcome> {
    let add = git(dir, &["add", "-A"]);
    let output = runner.run(&add);
    if !output.success {
        return Err(Error::commit_failed(command::failure_details(&add, &output)));
    }

    let commit = git(dir, &["commit", "-m", message]);
    let output = runner.run(&commit);
    if output.success {
        return Ok(CommitOutcome::Committed);
    }
    if is_nothing_to_commit(&output) {
        return Ok(CommitOutcome::NothingToCommit);
    }
    Err(Error::commit_failed(command::failure_details(&commit, &output)))
}

fn is_nothing_to_commit(output: &CommandOutput) -> bool {
    command::mentions(output, "nothing to commit")
        || command::mentions(output, "nothing added to commit")
}

/// Push `HEAD` to the remote deployment branch, streaming progress to `sink`.
pub fn push_streaming(
    runner: &dyn ProcessRunner,
    dir: &Path,
    remote: &str,
    branch: &str,
    sink: &mut dyn FnMut(StreamKind, &str),
) -> Result<()> {
    let refspec = format!("HEAD:{}", branch);
    let invocation = git(dir, &["push", remote, &refspec]);
    let output = runner.stream(&invocation, sink);
    if !output.success {
        return Err(Error::publish_failed(command::failure_details(
            &invocation, &output,
        )));
    }
    Ok(())
}
