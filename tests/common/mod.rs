#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use slipway::context::{DeployConfig, Environment};
use slipway::process::{CommandOutput, Invocation, ProcessRunner, StreamKind};
use tempfile::TempDir;

struct Rule {
    program: String,
    prefix: Vec<String>,
    output: CommandOutput,
    chunks: Vec<(StreamKind, String)>,
}

/// Scripted `ProcessRunner` that records every invocation.
///
/// Rules match on program plus argument prefix; the first match wins. Anything
/// unmatched succeeds with empty output.
pub struct FakeRunner {
    rules: Vec<Rule>,
    calls: RefCell<Vec<Invocation>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn on(mut self, program: &str, prefix: &[&str], output: CommandOutput) -> Self {
        self.rules.push(Rule {
            program: program.to_string(),
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            output,
            chunks: Vec::new(),
        });
        self
    }

    /// Add a rule that takes precedence over every rule added so far.
    pub fn override_with(mut self, program: &str, prefix: &[&str], output: CommandOutput) -> Self {
        self.rules.insert(
            0,
            Rule {
                program: program.to_string(),
                prefix: prefix.iter().map(|s| s.to_string()).collect(),
                output,
                chunks: Vec::new(),
            },
        );
        self
    }

    /// Streaming variant of [`FakeRunner::override_with`].
    pub fn override_stream(
        mut self,
        program: &str,
        prefix: &[&str],
        chunks: &[(StreamKind, &str)],
        output: CommandOutput,
    ) -> Self {
        self.rules.insert(
            0,
            Rule {
                program: program.to_string(),
                prefix: prefix.iter().map(|s| s.to_string()).collect(),
                output,
                chunks: chunks.iter().map(|(k, t)| (*k, t.to_string())).collect(),
            },
        );
        self
    }

    /// Like [`FakeRunner::on`], but `stream` also delivers `chunks` to the sink first.
    pub fn on_stream(
        mut self,
        program: &str,
        prefix: &[&str],
        chunks: &[(StreamKind, &str)],
        output: CommandOutput,
    ) -> Self {
        self.rules.push(Rule {
            program: program.to_string(),
            prefix: prefix.iter().map(|s| s.to_string()).collect(),
            output,
            chunks: chunks.iter().map(|(k, t)| (*k, t.to_string())).collect(),
        });
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    pub fn call_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.display()).collect()
    }

    pub fn count(&self, program: &str, prefix: &[&str]) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.program == program && starts_with(&c.args, prefix))
            .count()
    }

    pub fn invoked_program(&self, program: &str) -> bool {
        self.calls.borrow().iter().any(|c| c.program == program)
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn find(&self, invocation: &Invocation) -> Option<&Rule> {
        self.rules.iter().find(|rule| {
            rule.program == invocation.program && starts_with(&invocation.args, &rule.prefix)
        })
    }
}

fn starts_with<S: AsRef<str>>(args: &[String], prefix: &[S]) -> bool {
    args.len() >= prefix.len() && prefix.iter().zip(args).all(|(p, a)| p.as_ref() == a.as_str())
}

impl ProcessRunner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> CommandOutput {
        self.calls.borrow_mut().push(invocation.clone());
        self.find(invocation)
            .map(|rule| rule.output.clone())
            .unwrap_or_else(|| CommandOutput::ok(""))
    }

    fn stream(
        &self,
        invocation: &Invocation,
        sink: &mut dyn FnMut(StreamKind, &str),
    ) -> CommandOutput {
        self.calls.borrow_mut().push(invocation.clone());
        match self.find(invocation) {
            Some(rule) => {
                for (kind, text) in &rule.chunks {
                    sink(*kind, text);
                }
                rule.output.clone()
            }
            None => CommandOutput::ok(""),
        }
    }
}

/// Scratch layout: a deployable app, a not-yet-created dest, and a netrc.
pub struct Workspace {
    pub root: TempDir,
    pub src: PathBuf,
    pub dest: PathBuf,
    pub netrc: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let src = root.path().join("app");
        let dest = root.path().join("deploy");
        let netrc = root.path().join(".netrc");

        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("package.json"), r#"{"name":"demo","version":"1.0.0"}"#).unwrap();
        fs::write(src.join("Procfile"), "web: node index.js\n").unwrap();
        fs::write(src.join("index.js"), "console.log('hi');\n").unwrap();
        fs::write(
            &netrc,
            "machine api.heroku.com\n  login ada@example.com\n  password secret\n",
        )
        .unwrap();

        Self {
            root,
            src,
            dest,
            netrc,
        }
    }

    pub fn config(&self) -> DeployConfig {
        DeployConfig {
            source_path: self.src.display().to_string(),
            dest_path: self.dest.display().to_string(),
            ..Default::default()
        }
    }

    pub fn environment(&self) -> Environment {
        Environment {
            deployer: "ada".to_string(),
            credentials_path: self.netrc.clone(),
            started_at: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap(),
        }
    }

    pub fn remove(&self, name: &str) {
        fs::remove_file(self.src.join(name)).unwrap();
    }
}

pub fn dir_is_untouched(path: &Path) -> bool {
    !path.exists()
}

/// Platform CLI that is installed, current, and has no app linked yet.
pub fn fresh_platform() -> FakeRunner {
    FakeRunner::new()
        .on("which", &["heroku"], CommandOutput::ok("/usr/local/bin/heroku\n"))
        .on(
            "heroku",
            &["--version"],
            CommandOutput::ok("heroku/7.60.1 linux-x64 node-v14.19.0\n"),
        )
        .on(
            "git",
            &["rev-parse", "--show-toplevel"],
            CommandOutput::failed(
                128,
                "fatal: not a git repository (or any of the parent directories): .git",
            ),
        )
        .on(
            "heroku",
            &["info"],
            CommandOutput::failed(1, " ▸    Couldn't find that app."),
        )
        .on(
            "heroku",
            &["create"],
            CommandOutput::ok(
                "Creating sharp-rain-871... done, stack is cedar\nhttp://sharp-rain-871.herokuapp.com/ | git@heroku.com:sharp-rain-871.git\nGit remote heroku added\n",
            ),
        )
        .on("git", &["branch", "-av"], CommandOutput::ok("* master 1a2b3c4 Initial commit.\n"))
        .on_stream(
            "git",
            &["push"],
            &[
                (StreamKind::Stderr, "remote: Compressing source files... done.\n"),
                (StreamKind::Stderr, "remote: Verifying deploy... done.\n"),
            ],
            CommandOutput::ok(""),
        )
}
