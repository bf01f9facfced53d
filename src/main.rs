use clap::{Parser, Subcommand};

use commands::GlobalArgs;

mod commands;
mod output;
mod tty;

use commands::{check, config, deploy, steps};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "slipway")]
#[command(version = VERSION)]
#[command(about = "Deploy a Node.js app folder to a Heroku-style git platform")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync the src folder into dest, commit, and push it to the platform
    Deploy(deploy::DeployArgs),
    /// Run the read-only checks (tool, version, auth, src) without deploying
    Check(check::CheckArgs),
    /// List the deployment steps in execution order
    Steps(steps::StepsArgs),
    /// Manage global Slipway configuration
    Config(config::ConfigArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs {};

    tty::status("slipway is working...");
    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    let _ = output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
