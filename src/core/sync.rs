//! Mirror the source tree into the deployment copy with rsync.

use std::path::Path;

use crate::error::{Error, Result};
use crate::process::{Invocation, ProcessRunner};
use crate::utils::command;

/// Build the rsync call that makes `dest` an exact mirror of the contents of `source`.
///
/// The trailing separator on the source means "contents of", not the directory itself.
/// Excluded paths are neither copied nor deleted on the receiving side, which is what
/// keeps the destination's `.git` intact.
pub fn mirror_invocation(source: &Path, dest: &Path, excludes: &[String]) -> Invocation {
    let mut args = vec![
        "--recursive".to_string(),
        "--links".to_string(),
        "--times".to_string(),
        "--delete".to_string(),
    ];
    args.extend(excludes.iter().map(|pattern| format!("--exclude={}", pattern)));
    args.push(with_trailing_separator(source));
    args.push(dest.display().to_string());

    Invocation::new("rsync", args)
}

fn with_trailing_separator(path: &Path) -> String {
    let raw = path.display().to_string();
    if raw.ends_with(std::path::MAIN_SEPARATOR) {
        raw
    } else {
        format!("{}{}", raw, std::path::MAIN_SEPARATOR)
    }
}

pub fn mirror(
    runner: &dyn ProcessRunner,
    source: &Path,
    dest: &Path,
    excludes: &[String],
) -> Result<()> {
    let invocation = mirror_invocation(source, dest, excludes);
    let output = runner.run(&invocation);
    if !output.success {
        return Err(Error::sync_failed(command::failure_details(
            &invocation, &output,
        )));
    }
    Ok(())
}
