use serde::Serialize;
use serde_json::Value;

use crate::context::{ContextSummary, DeployConfig, DeploymentContext, Environment};
use crate::defaults::Defaults;
use crate::error::{Error, Result};
use crate::pipeline::{self, PipelineOutcome, PipelineRunResult, Step, StepEnv, TraceSink};
use crate::process::ProcessRunner;
use crate::steps;

/// Which step list a report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Catalog {
    Deploy,
    Preflight,
}

/// Result of one deploy (or preflight) run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployReport {
    pub catalog: Catalog,
    pub context: ContextSummary,
    pub pipeline: PipelineRunResult,
}

impl DeployReport {
    pub fn is_success(&self) -> bool {
        self.pipeline.outcome.is_success()
    }

    /// Turn a failed run into the failing step's error, keeping its code, message and hints.
    ///
    /// The error's details gain `step` and the full serialized report so nothing is lost.
    pub fn into_result(self) -> Result<DeployReport> {
        let failure = match &self.pipeline.outcome {
            PipelineOutcome::Success => None,
            PipelineOutcome::Failure { step, error } => Some((step.clone(), error.clone())),
        };
        let Some((step, error)) = failure else {
            return Ok(self);
        };

        let report = serde_json::to_value(&self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize deploy report".to_string()))
        })?;

        let mut details = match error.details {
            Value::Object(map) => map,
            Value::Null => serde_json::Map::new(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("cause".to_string(), other);
                map
            }
        };
        details.insert("step".to_string(), Value::String(step));
        details.insert("report".to_string(), report);

        Err(Error {
            details: Value::Object(details),
            ..error
        })
    }
}

/// High-level deploy entry point.
///
/// Resolves the context once, then runs the full step catalog. Returns `Err` only
/// for invalid input; step failures come back inside the report.
pub fn run(
    config: &DeployConfig,
    environment: &Environment,
    defaults: &Defaults,
    runner: &dyn ProcessRunner,
    trace: &mut dyn TraceSink,
) -> Result<DeployReport> {
    let ctx = DeploymentContext::resolve(
        config,
        environment,
        defaults.platform.clone(),
        &defaults.exclude,
    )?;
    Ok(run_catalog(Catalog::Deploy, &steps::deploy_steps(), &ctx, runner, trace))
}

/// Run only the read-only checks. The destination is optional and never touched.
pub fn preflight(
    config: &DeployConfig,
    environment: &Environment,
    defaults: &Defaults,
    runner: &dyn ProcessRunner,
    trace: &mut dyn TraceSink,
) -> Result<DeployReport> {
    let mut config = config.clone();
    if config.dest_path.trim().is_empty() {
        config.dest_path = config.source_path.clone();
    }

    let ctx = DeploymentContext::resolve(
        &config,
        environment,
        defaults.platform.clone(),
        &defaults.exclude,
    )?;
    Ok(run_catalog(Catalog::Preflight, &steps::preflight_steps(), &ctx, runner, trace))
}

fn run_catalog(
    catalog: Catalog,
    steps: &[Step],
    ctx: &DeploymentContext,
    runner: &dyn ProcessRunner,
    trace: &mut dyn TraceSink,
) -> DeployReport {
    let mut env = StepEnv { ctx, runner, trace };
    let pipeline = pipeline::run(steps, &mut env);

    DeployReport {
        catalog,
        context: ContextSummary::from(ctx),
        pipeline,
    }
}
