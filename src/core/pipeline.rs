use serde::{Deserialize, Serialize};

use crate::context::DeploymentContext;
use crate::error::{Error, ErrorCode, Hint, Result};
use crate::process::{ProcessRunner, StreamKind};

// ============================================================================
// Steps
// ============================================================================

/// Everything a step may touch: the read-only context, the process seam, and the trace.
pub struct StepEnv<'a> {
    pub ctx: &'a DeploymentContext,
    pub runner: &'a dyn ProcessRunner,
    pub trace: &'a mut dyn TraceSink,
}

pub type StepFn = fn(&mut StepEnv<'_>) -> Result<StepOutcome>;

#[derive(Clone, Copy)]
pub struct Step {
    pub id: &'static str,
    pub label: &'static str,
    /// Whether the step can change the destination or the remote platform.
    pub mutates: bool,
    pub run: StepFn,
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("mutates", &self.mutates)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// The step acted on the environment.
    Done,
    /// Observed state was already as desired.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub kind: OutcomeKind,
    pub detail: Option<String>,
}

impl StepOutcome {
    pub fn done() -> Self {
        Self {
            kind: OutcomeKind::Done,
            detail: None,
        }
    }

    pub fn done_with(detail: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::Done,
            detail: Some(detail.into()),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::Skipped,
            detail: Some(reason.into()),
        }
    }
}

// ============================================================================
// Trace
// ============================================================================

/// Operator-visible events. Rendering is up to the sink; nothing here affects control flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    StepStarted {
        index: usize,
        total: usize,
        id: String,
        label: String,
    },
    StepFinished {
        id: String,
        status: PipelineStepStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    StepFailed {
        id: String,
        code: String,
        message: String,
    },
    Output {
        stream: StreamKind,
        text: String,
    },
    Note {
        message: String,
    },
}

pub trait TraceSink {
    fn emit(&mut self, event: TraceEvent);
}

/// Keeps every event in order.
#[derive(Debug, Default)]
pub struct RecordingTrace {
    pub events: Vec<TraceEvent>,
}

impl RecordingTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenated text of all streamed output events.
    pub fn streamed_output(&self) -> String {
        self.events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::Output { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn started_ids(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::StepStarted { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl TraceSink for RecordingTrace {
    fn emit(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStepStatus {
    Succeeded,
    Skipped,
    Failed,
    NotRun,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepFailure {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStepResult {
    pub id: String,
    pub label: String,
    pub status: PipelineStepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<StepFailure>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<Hint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineRunStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRunSummary {
    pub total_steps: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub not_run: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_actions: Vec<String>,
}

/// Terminal value of a run.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    Success,
    Failure { step: String, error: Error },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Success)
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            PipelineOutcome::Success => None,
            PipelineOutcome::Failure { error, .. } => Some(error.code),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRunResult {
    pub status: PipelineRunStatus,
    pub steps: Vec<PipelineStepResult>,
    pub summary: PipelineRunSummary,
    #[serde(skip)]
    pub outcome: PipelineOutcome,
}

// ============================================================================
// Runner
// ============================================================================

/// Run `steps` in order, one at a time, stopping at the first failure.
///
/// Steps after a failure are never invoked; they are reported as `not_run`.
pub fn run(steps: &[Step], env: &mut StepEnv<'_>) -> PipelineRunResult {
    let total = steps.len();
    let mut results = Vec::with_capacity(total);
    let mut failure: Option<(String, Error)> = None;

    for (index, step) in steps.iter().enumerate() {
        if failure.is_some() {
            results.push(not_run(step));
            continue;
        }

        env.trace.emit(TraceEvent::StepStarted {
            index,
            total,
            id: step.id.to_string(),
            label: step.label.to_string(),
        });

        match (step.run)(env) {
            Ok(outcome) => {
                let status = match outcome.kind {
                    OutcomeKind::Done => PipelineStepStatus::Succeeded,
                    OutcomeKind::Skipped => PipelineStepStatus::Skipped,
                };
                env.trace.emit(TraceEvent::StepFinished {
                    id: step.id.to_string(),
                    status,
                    detail: outcome.detail.clone(),
                });
                results.push(PipelineStepResult {
                    id: step.id.to_string(),
                    label: step.label.to_string(),
                    status,
                    detail: outcome.detail,
                    error: None,
                    hints: Vec::new(),
                });
            }
            Err(err) => {
                env.trace.emit(TraceEvent::StepFailed {
                    id: step.id.to_string(),
                    code: err.code.as_str().to_string(),
                    message: err.message.clone(),
                });
                results.push(PipelineStepResult {
                    id: step.id.to_string(),
                    label: step.label.to_string(),
                    status: PipelineStepStatus::Failed,
                    detail: None,
                    error: Some(StepFailure {
                        code: err.code.as_str().to_string(),
                        message: err.message.clone(),
                    }),
                    hints: err.hints.clone(),
                });
                failure = Some((step.id.to_string(), err));
            }
        }
    }

    let (status, outcome) = match failure {
        None => (PipelineRunStatus::Success, PipelineOutcome::Success),
        Some((step, error)) => (
            PipelineRunStatus::Failed,
            PipelineOutcome::Failure { step, error },
        ),
    };
    let summary = build_summary(&results, status);

    PipelineRunResult {
        status,
        steps: results,
        summary,
        outcome,
    }
}

fn not_run(step: &Step) -> PipelineStepResult {
    PipelineStepResult {
        id: step.id.to_string(),
        label: step.label.to_string(),
        status: PipelineStepStatus::NotRun,
        detail: None,
        error: None,
        hints: Vec::new(),
    }
}

fn build_summary(results: &[PipelineStepResult], status: PipelineRunStatus) -> PipelineRunSummary {
    let count = |wanted: PipelineStepStatus| results.iter().filter(|r| r.status == wanted).count();

    let next_actions = match status {
        PipelineRunStatus::Failed => vec![concat!(
            "Fix the issue and re-run ",
            "(idempotent - completed steps will be skipped or repeated safely)"
        )
        .to_string()],
        PipelineRunStatus::Success => Vec::new(),
    };

    PipelineRunSummary {
        total_steps: results.len(),
        succeeded: count(PipelineStepStatus::Succeeded),
        skipped: count(PipelineStepStatus::Skipped),
        failed: count(PipelineStepStatus::Failed),
        not_run: count(PipelineStepStatus::NotRun),
        next_actions,
    }
}
