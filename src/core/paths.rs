use crate::error::{Error, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Base slipway config directory (universal ~/.config/slipway/ on all platforms)
pub fn slipway() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected(
                "APPDATA environment variable not set on Windows".to_string(),
            )
        })?;
        Ok(PathBuf::from(appdata).join("slipway"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("slipway"))
    }
}

/// Global slipway.json config file path
pub fn slipway_json() -> Result<PathBuf> {
    Ok(slipway()?.join("slipway.json"))
}

/// Expand `~` and resolve against the current directory.
///
/// The path does not need to exist. A trailing separator is dropped.
pub fn absolutize(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::tilde(raw.trim()).into_owned();
    let path = Path::new(&expanded);

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map_err(|e| Error::internal_io(e.to_string(), Some("read current dir".to_string())))?
            .join(path)
    };

    Ok(normalize(&absolute))
}

/// Lexically normalize a path: drop `.` segments, fold `..`, strip trailing separators.
pub fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Compare two paths after resolving symlinks where possible.
///
/// Falls back to lexical comparison when either side cannot be canonicalized.
pub fn same_location(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => normalize(a) == normalize(b),
    }
}
