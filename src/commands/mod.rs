use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;

pub type CmdResult<T> = slipway::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

// ============================================================================
// JSON Input Parsing (CLI layer)
// ============================================================================

/// Read JSON spec from string, file (@path), or stdin (-).
fn read_json_spec_to_string(spec: &str) -> slipway::Result<String> {
    use std::io::IsTerminal;

    if spec.trim() == "-" {
        let mut buf = String::new();
        let mut stdin = std::io::stdin();
        if stdin.is_terminal() {
            return Err(slipway::Error::validation_invalid_argument(
                "json",
                "Cannot read JSON from stdin when stdin is a TTY",
                None,
                None,
            ));
        }
        stdin.read_to_string(&mut buf).map_err(|e| {
            slipway::Error::internal_io(e.to_string(), Some("read stdin".to_string()))
        })?;
        return Ok(buf);
    }

    if let Some(path) = spec.strip_prefix('@') {
        if path.trim().is_empty() {
            return Err(slipway::Error::validation_invalid_argument(
                "json",
                "Invalid JSON spec '@' (missing file path)",
                None,
                None,
            ));
        }
        return slipway::io::read_file(Path::new(path), &format!("read {}", path));
    }

    Ok(spec.to_string())
}

/// Parse an optional JSON spec into `T`, or `T::default()` when absent.
pub fn parse_json_spec<T>(spec: Option<&str>) -> slipway::Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(spec) = spec else {
        return Ok(T::default());
    };

    let raw = read_json_spec_to_string(spec)?;
    serde_json::from_str(&raw).map_err(|e| {
        slipway::Error::validation_invalid_json(
            e,
            Some("parse JSON spec".to_string()),
            Some(raw.chars().take(200).collect::<String>()),
        )
    })
}

pub mod check;
pub mod config;
pub mod deploy;
pub mod steps;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (slipway::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Deploy(args) => dispatch!(args, global, deploy),
        crate::Commands::Check(args) => dispatch!(args, global, check),
        crate::Commands::Steps(args) => dispatch!(args, global, steps),
        crate::Commands::Config(args) => dispatch!(args, global, config),
    }
}
