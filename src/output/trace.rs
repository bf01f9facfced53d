//! Human-readable pipeline progress on stderr.

use std::io::{self, Write};

use slipway::pipeline::{PipelineStepStatus, TraceEvent, TraceSink};

/// Renders `[n/N] label ... ok` lines; streamed tool output is passed through verbatim.
#[derive(Debug, Default)]
pub struct StderrTrace {
    /// A step line has been started but not yet terminated with a newline.
    line_open: bool,
}

impl StderrTrace {
    pub fn new() -> Self {
        Self::default()
    }

    fn close_line(&mut self, out: &mut impl Write) {
        if self.line_open {
            let _ = writeln!(out);
            self.line_open = false;
        }
    }
}

impl TraceSink for StderrTrace {
    fn emit(&mut self, event: TraceEvent) {
        let stderr = io::stderr();
        let mut out = stderr.lock();
        render(self, &mut out, event);
        let _ = out.flush();
    }
}

fn render(trace: &mut StderrTrace, out: &mut impl Write, event: TraceEvent) {
    match event {
        TraceEvent::StepStarted {
            index,
            total,
            label,
            ..
        } => {
            trace.close_line(out);
            let _ = write!(out, "[{}/{}] {} ... ", index + 1, total, label);
            trace.line_open = true;
        }
        TraceEvent::StepFinished { status, detail, .. } => {
            let word = match status {
                PipelineStepStatus::Skipped => "skipped",
                _ => "ok",
            };
            if !trace.line_open {
                let _ = write!(out, "... ");
            }
            match detail {
                Some(detail) => {
                    let _ = writeln!(out, "{} ({})", word, detail);
                }
                None => {
                    let _ = writeln!(out, "{}", word);
                }
            }
            trace.line_open = false;
        }
        TraceEvent::StepFailed { message, .. } => {
            trace.close_line(out);
            let _ = writeln!(out, "FAILED: {}", message);
        }
        TraceEvent::Output { text, .. } => {
            trace.close_line(out);
            let _ = write!(out, "{}", text);
        }
        TraceEvent::Note { message } => {
            trace.close_line(out);
            let _ = writeln!(out, "  note: {}", message);
        }
    }
}
