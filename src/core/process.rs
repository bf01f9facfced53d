//! External process execution behind a swappable runner.
//!
//! Every call the pipeline makes to git, the platform CLI, or rsync goes
//! through [`ProcessRunner`]. [`SystemRunner`] spawns real processes; tests
//! substitute a recording fake.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;

use serde::Serialize;

use crate::utils::shell;

/// A program plus arguments, optionally run from a working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
        }
    }

    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    /// Shell-quoted rendering, for traces and error details only.
    pub fn display(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(self.args.iter().cloned());
        shell::quote_args(&parts)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            exit_code: 0,
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
            exit_code,
        }
    }

    /// Output for a process that could not be started at all.
    pub fn spawn_error(err: &std::io::Error) -> Self {
        Self::failed(-1, format!("Command error: {}", err))
    }
}

/// Which stream a chunk of live output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

pub trait ProcessRunner {
    /// Run to completion and capture stdout/stderr.
    fn run(&self, invocation: &Invocation) -> CommandOutput;

    /// Run to completion, handing each chunk of output to `sink` as it arrives.
    ///
    /// The returned output carries the exit status; its stdout/stderr hold the
    /// full text that was streamed.
    fn stream(
        &self,
        invocation: &Invocation,
        sink: &mut dyn FnMut(StreamKind, &str),
    ) -> CommandOutput;
}

/// Runs real processes with `std::process::Command`.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    envs: Vec<(String, String)>,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra environment variables set on every spawned process.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    fn command(&self, invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }
        cmd.envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        cmd.stdin(Stdio::null());
        cmd
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> CommandOutput {
        match self.command(invocation).output() {
            Ok(out) => CommandOutput {
                stdout: String::from_utf8_lossy(&out.stdout).to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).to_string(),
                success: out.status.success(),
                exit_code: out.status.code().unwrap_or(-1),
            },
            Err(e) => CommandOutput::spawn_error(&e),
        }
    }

    fn stream(
        &self,
        invocation: &Invocation,
        sink: &mut dyn FnMut(StreamKind, &str),
    ) -> CommandOutput {
        let mut child = match self
            .command(invocation)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return CommandOutput::spawn_error(&e),
        };

        let (tx, rx) = mpsc::channel::<(StreamKind, String)>();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, StreamKind::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, StreamKind::Stderr, tx.clone()));
        }
        drop(tx);

        let mut stdout = String::new();
        let mut stderr = String::new();

        // Ends once both readers hit EOF and drop their senders.
        for (kind, chunk) in rx {
            sink(kind, &chunk);
            match kind {
                StreamKind::Stdout => stdout.push_str(&chunk),
                StreamKind::Stderr => stderr.push_str(&chunk),
            }
        }

        for reader in readers {
            let _ = reader.join();
        }

        match child.wait() {
            Ok(status) => CommandOutput {
                stdout,
                stderr,
                success: status.success(),
                exit_code: status.code().unwrap_or(-1),
            },
            Err(e) => {
                stderr.push_str(&format!("Command error: {}", e));
                CommandOutput {
                    stdout,
                    stderr,
                    success: false,
                    exit_code: -1,
                }
            }
        }
    }
}

fn spawn_reader<R>(
    mut source: R,
    kind: StreamKind,
    tx: mpsc::Sender<(StreamKind, String)>,
) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = [0u8; 4096];
        // Bytes of a character split across reads wait here for the rest.
        let mut pending: Vec<u8> = Vec::new();
        loop {
            match source.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    pending.extend_from_slice(&buf[..n]);
                    let end = complete_utf8_len(&pending);
                    if end == 0 {
                        continue;
                    }
                    let chunk = String::from_utf8_lossy(&pending[..end]).into_owned();
                    pending.drain(..end);
                    if tx.send((kind, chunk)).is_err() {
                        return;
                    }
                }
            }
        }
        if !pending.is_empty() {
            let _ = tx.send((kind, String::from_utf8_lossy(&pending).into_owned()));
        }
    })
}

/// Length of the prefix of `bytes` that does not end inside a multi-byte
/// character. Invalid sequences count as complete so they are not held back.
fn complete_utf8_len(bytes: &[u8]) -> usize {
    match std::str::from_utf8(bytes) {
        Ok(_) => bytes.len(),
        Err(e) => match e.error_len() {
            None => e.valid_up_to(),
            Some(len) => {
                let skip = e.valid_up_to() + len;
                skip + complete_utf8_len(&bytes[skip..])
            }
        },
    }
}
