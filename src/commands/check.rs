use clap::Args;
use serde::Serialize;

use slipway::defaults;
use slipway::deploy::{self, DeployReport};
use slipway::log_status;
use slipway::process::SystemRunner;

use super::deploy::{build_config, build_environment, TargetArgs};
use super::CmdResult;
use crate::output::StderrTrace;

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

#[derive(Serialize)]
pub struct CheckOutput {
    pub command: String,
    #[serde(flatten)]
    pub report: DeployReport,
}

pub fn run(args: CheckArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<CheckOutput> {
    let defaults = defaults::load_defaults();
    let config = build_config(&args.target, None, &[])?;
    let environment = build_environment(&defaults, args.target.credentials.as_deref(), None)?;

    log_status!("check", "Checking src folder {}", config.source_path);

    let runner = SystemRunner::new();
    let mut trace = StderrTrace::new();
    let report =
        deploy::preflight(&config, &environment, &defaults, &runner, &mut trace)?.into_result()?;

    Ok((
        CheckOutput {
            command: "check".to_string(),
            report,
        },
        0,
    ))
}
