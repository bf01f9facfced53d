use clap::Args;
use serde::Serialize;

use slipway::steps;

use super::CmdResult;

#[derive(Args)]
pub struct StepsArgs {
    /// Only list the read-only checks run by `check`
    #[arg(long)]
    pub preflight: bool,
}

#[derive(Debug, Serialize)]
pub struct StepEntry {
    pub position: usize,
    pub id: String,
    pub label: String,
    pub mutates: bool,
}

#[derive(Debug, Serialize)]
pub struct StepsOutput {
    pub command: String,
    pub steps: Vec<StepEntry>,
}

pub fn run(args: StepsArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<StepsOutput> {
    let catalog = if args.preflight {
        steps::preflight_steps()
    } else {
        steps::deploy_steps()
    };

    let steps = catalog
        .iter()
        .enumerate()
        .map(|(i, step)| StepEntry {
            position: i + 1,
            id: step.id.to_string(),
            label: step.label.to_string(),
            mutates: step.mutates,
        })
        .collect();

    Ok((
        StepsOutput {
            command: "steps".to_string(),
            steps,
        },
        0,
    ))
}
