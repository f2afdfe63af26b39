use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::query::SolverQuery;
use crate::solver::{budget_secs, SolverBackend, SolverError, SolverResult, SolverStatistics};

/// How long output still buffered in the pipes is awaited after a kill.
const KILLED_STREAM_WAIT: Duration = Duration::from_millis(250);

/// Which solver binary to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    #[default]
    Z3,
    Cvc5,
    /// Any program; `command` and `args` must be configured.
    Custom,
}

/// Subprocess solver configuration.
///
/// `args` may use the placeholders `{query}`, `{timeout_secs}` and
/// `{timeout_ms}`. When empty, the kind's default argument list is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SolverConfig {
    pub kind: SolverKind,
    /// Program to run; defaults to `z3` / `cvc5`.
    pub command: Option<String>,
    pub args: Vec<String>,
    /// Per-query budget handed to the solver.
    pub timeout_secs: u64,
    /// Extra wall-clock time granted before the process is killed.
    pub grace_ms: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            kind: SolverKind::Z3,
            command: None,
            args: Vec::new(),
            timeout_secs: 1,
            grace_ms: 2000,
        }
    }
}

impl SolverConfig {
    pub fn custom(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            kind: SolverKind::Custom,
            command: Some(command.into()),
            args,
            ..Self::default()
        }
    }

    pub fn budget(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn default_args(&self) -> Vec<String> {
        let args: &[&str] = match self.kind {
            SolverKind::Z3 => &["-smt2", "{query}", "-T:{timeout_secs}"],
            SolverKind::Cvc5 => &[
                "--lang",
                "smt2",
                "--produce-models",
                "--tlimit={timeout_ms}",
                "{query}",
            ],
            SolverKind::Custom => &["{query}"],
        };
        args.iter().map(|a| a.to_string()).collect()
    }

    fn program(&self) -> String {
        match (&self.command, self.kind) {
            (Some(cmd), _) => cmd.clone(),
            (None, SolverKind::Z3) => "z3".into(),
            (None, SolverKind::Cvc5) => "cvc5".into(),
            (None, SolverKind::Custom) => String::new(),
        }
    }
}

/// Runs one solver process per query against the query file.
#[derive(Debug, Clone)]
pub struct ProcessSolver {
    config: SolverConfig,
    program: String,
}

impl ProcessSolver {
    pub fn new(config: SolverConfig) -> Self {
        let program = config.program();
        Self { config, program }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Argument vector with placeholders filled in.
    pub fn render_args(&self, query_path: &Path) -> Vec<String> {
        let template = if self.config.args.is_empty() {
            self.config.default_args()
        } else {
            self.config.args.clone()
        };
        let secs = budget_secs(self.config.budget()).to_string();
        let ms = (budget_secs(self.config.budget()) * 1000).to_string();
        let query = query_path.display().to_string();
        template
            .iter()
            .map(|arg| {
                arg.replace("{query}", &query)
                    .replace("{timeout_secs}", &secs)
                    .replace("{timeout_ms}", &ms)
            })
            .collect()
    }
}

/// Owns a child process; kills and reaps it unless it was already waited on.
struct ChildGuard {
    child: Child,
    reaped: bool,
}

impl ChildGuard {
    /// Kill the child together with every process in its group.
    fn kill(&mut self) {
        kill_group(&self.child);
        let _ = self.child.kill();
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.reaped {
            self.kill();
            let _ = self.child.wait();
        }
    }
}

/// Put the solver in a process group of its own so wrapper scripts and
/// portfolio children die with it.
#[cfg(unix)]
fn isolate(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate(_command: &mut Command) {}

#[cfg(unix)]
fn kill_group(child: &Child) {
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: `isolate` made the unreaped child the leader of group `pgid`.
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

fn drain<R: Read + Send + 'static>(mut stream: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stream.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Collect a drained stream. After a kill the wait is bounded and a stream
/// still held open by an escaped descendant is abandoned.
fn collect(
    stream: Receiver<String>,
    name: &'static str,
    killed: bool,
) -> Result<String, SolverError> {
    if !killed {
        return stream.recv().map_err(|_| SolverError::StreamCapture(name));
    }
    match stream.recv_timeout(KILLED_STREAM_WAIT) {
        Ok(text) => Ok(text),
        Err(RecvTimeoutError::Timeout) => {
            warn!(stream = name, "abandoning solver output held open after kill");
            Ok(String::new())
        }
        Err(RecvTimeoutError::Disconnected) => Err(SolverError::StreamCapture(name)),
    }
}

impl SolverBackend for ProcessSolver {
    fn name(&self) -> &str {
        &self.program
    }

    fn solve(&self, query: &SolverQuery, query_path: &Path) -> Result<SolverResult, SolverError> {
        let args = self.render_args(query_path);
        debug!(solver = %self.program, query = %query.kind, ?args, "launching solver");

        let started = Instant::now();
        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        isolate(&mut command);
        let child = command
            .spawn()
            .map_err(|source| SolverError::Spawn {
                command: self.program.clone(),
                source,
            })?;
        let mut guard = ChildGuard {
            child,
            reaped: false,
        };

        let stdout = guard
            .child
            .stdout
            .take()
            .ok_or(SolverError::StreamCapture("stdout"))?;
        let stderr = guard
            .child
            .stderr
            .take()
            .ok_or(SolverError::StreamCapture("stderr"))?;
        let stdout = drain(stdout);
        let stderr = drain(stderr);

        let deadline = self.config.budget() + Duration::from_millis(self.config.grace_ms);
        let exit = guard.child.wait_timeout(deadline)?;
        let killed = exit.is_none();
        if killed {
            guard.kill();
            guard.child.wait()?;
        }
        guard.reaped = true;

        let stdout = collect(stdout, "stdout", killed)?;
        let stderr = collect(stderr, "stderr", killed)?;
        let statistics = SolverStatistics {
            elapsed_ms: started.elapsed().as_millis(),
            exit_code: exit.and_then(|status| status.code()),
            killed,
        };
        debug!(
            solver = %self.program,
            query = %query.kind,
            elapsed_ms = statistics.elapsed_ms,
            "solver finished"
        );

        if killed {
            warn!(
                solver = %self.program,
                query = %query.kind,
                deadline_ms = deadline.as_millis(),
                "solver exceeded its deadline and was killed"
            );
            let mut diagnostics = format!(
                "solver `{}` exceeded its {} ms deadline and was killed\n",
                self.program,
                deadline.as_millis()
            );
            diagnostics.push_str(&stderr);
            return Ok(SolverResult::unknown(diagnostics, statistics));
        }

        Ok(SolverResult::from_output(&stdout, &stderr, statistics))
    }
}
