use clap::{Args, Subcommand};
use serde::Serialize;

use slipway::defaults::{self, Defaults, SlipwayConfig};

use super::CmdResult;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Display configuration (merged defaults + file)
    Show {
        /// Show only built-in defaults (ignore slipway.json)
        #[arg(long)]
        builtin: bool,
    },
    /// Reset configuration to built-in defaults (deletes slipway.json)
    Reset,
    /// Show the path to slipway.json
    Path,
}

#[derive(Debug, Serialize)]
pub struct ConfigOutput {
    command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<SlipwayConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    defaults: Option<Defaults>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted: Option<bool>,
}

impl ConfigOutput {
    fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
            config: None,
            defaults: None,
            path: None,
            exists: None,
            deleted: None,
        }
    }
}

pub fn run(args: ConfigArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<ConfigOutput> {
    match args.command {
        ConfigCommand::Show { builtin } => show(builtin),
        ConfigCommand::Reset => reset(),
        ConfigCommand::Path => path(),
    }
}

fn show(builtin: bool) -> CmdResult<ConfigOutput> {
    let mut output = ConfigOutput::new("config.show");
    if builtin {
        output.defaults = Some(defaults::builtin_defaults());
    } else {
        output.config = Some(defaults::load_config());
    }
    Ok((output, 0))
}

fn reset() -> CmdResult<ConfigOutput> {
    let deleted = defaults::reset_config()?;

    let mut output = ConfigOutput::new("config.reset");
    output.defaults = Some(defaults::builtin_defaults());
    output.path = Some(defaults::config_path()?);
    output.deleted = Some(deleted);
    Ok((output, 0))
}

fn path() -> CmdResult<ConfigOutput> {
    let mut output = ConfigOutput::new("config.path");
    output.path = Some(defaults::config_path()?);
    output.exists = Some(defaults::config_exists());
    Ok((output, 0))
}
