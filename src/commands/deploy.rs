use clap::Args;
use serde::Serialize;

use slipway::context::{DeployConfig, Environment};
use slipway::defaults::{self, Defaults};
use slipway::deploy::{self, DeployReport};
use slipway::log_status;
use slipway::process::SystemRunner;

use super::CmdResult;
use crate::output::StderrTrace;

/// Inputs shared by `deploy` and `check`.
#[derive(Args, Debug, Default)]
pub struct TargetArgs {
    /// Source application folder (must contain package.json and Procfile)
    #[arg(long)]
    pub src: Option<String>,

    /// Deployment copy that is versioned and pushed to the platform
    #[arg(long)]
    pub dest: Option<String>,

    /// JSON input spec (supports @file and - for stdin); flags override its fields
    #[arg(long)]
    pub json: Option<String>,

    /// Path to the platform credentials file (default from config: ~/.netrc)
    #[arg(long)]
    pub credentials: Option<String>,
}

#[derive(Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Region for a newly created app (ignored when the app exists)
    #[arg(long)]
    pub region: Option<String>,

    /// Extra exclusion pattern for the sync (can be repeated)
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Name recorded in the deployment marker (default: $USER)
    #[arg(long)]
    pub user: Option<String>,
}

#[derive(Serialize)]
pub struct DeployOutput {
    pub command: String,
    #[serde(flatten)]
    pub report: DeployReport,
}

/// Merge a JSON spec with explicit flags. Flags win; excludes accumulate.
pub fn build_config(
    target: &TargetArgs,
    region: Option<&str>,
    exclude: &[String],
) -> slipway::Result<DeployConfig> {
    let mut config: DeployConfig = super::parse_json_spec(target.json.as_deref())?;

    if let Some(src) = &target.src {
        config.source_path = src.clone();
    }
    if let Some(dest) = &target.dest {
        config.dest_path = dest.clone();
    }
    if let Some(region) = region {
        config.new_app_region = Some(region.to_string());
    }
    config.exclude.extend(exclude.iter().cloned());

    Ok(config)
}

/// Resolve operator identity and credentials, letting flags override the environment.
pub fn build_environment(
    defaults: &Defaults,
    credentials: Option<&str>,
    user: Option<&str>,
) -> slipway::Result<Environment> {
    let mut environment = Environment::from_process(&defaults.platform)?;
    if let Some(path) = credentials {
        environment = environment.with_credentials_file(path)?;
    }
    if let Some(user) = user.map(str::trim).filter(|u| !u.is_empty()) {
        environment.deployer = user.to_string();
    }
    Ok(environment)
}

pub fn run(args: DeployArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<DeployOutput> {
    let defaults = defaults::load_defaults();
    let config = build_config(&args.target, args.region.as_deref(), &args.exclude)?;
    let environment = build_environment(
        &defaults,
        args.target.credentials.as_deref(),
        args.user.as_deref(),
    )?;

    log_status!("deploy", "Using src folder {}", config.source_path);
    log_status!("deploy", "Deploying from dest folder {}", config.dest_path);

    let runner = SystemRunner::new();
    let mut trace = StderrTrace::new();
    let report = deploy::run(&config, &environment, &defaults, &runner, &mut trace)?.into_result()?;

    Ok((
        DeployOutput {
            command: "deploy".to_string(),
            report,
        },
        0,
    ))
}
