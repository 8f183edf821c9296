//! ProcessRunner trait: the seam between launcher steps and the OS.
//!
//! Launcher steps describe commands as [`CommandSpec`] values and hand them to a
//! runner. [`SystemRunner`] spawns real processes; tests substitute a recorder.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use crate::error::LaunchError;
use crate::supervisor::{InterruptFlag, ManagedChild, POLL_INTERVAL};

/// A command to run: program, arguments and the complete child environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Full child environment. `None` inherits the parent's environment.
    pub env: Option<BTreeMap<String, String>>,
    /// Discard stdout/stderr instead of inheriting them.
    pub quiet: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: None,
            quiet: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Space-joined command line, for log output.
    pub fn display(&self) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// True when any argument equals `arg` (e.g. `venv`, `migrate`).
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(ref env) = self.env {
            cmd.env_clear().envs(env);
        }
        if self.quiet {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        cmd
    }
}

/// Exit status of a finished child. `code` is `None` when it was killed by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStatus {
    pub code: Option<i32>,
}

impl RunStatus {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for RunStatus {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

/// Exit status and captured stdout of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: RunStatus,
    pub stdout: String,
}

/// How a supervised child ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// The child exited on its own.
    Exited(RunStatus),
    /// An interrupt arrived; the child was asked to terminate.
    Interrupted,
}

/// Extension point for running launcher commands.
pub trait ProcessRunner {
    /// Run to completion and return the exit status.
    fn run(&self, cmd: &CommandSpec) -> Result<RunStatus, LaunchError>;

    /// Run to completion with stdout captured. Stderr follows `cmd.quiet`.
    fn capture(&self, cmd: &CommandSpec) -> Result<CommandOutput, LaunchError>;

    /// Start a long-lived child and block until it exits or `interrupt` fires.
    /// On interrupt the child gets SIGTERM, then SIGKILL once `grace` has elapsed.
    fn supervise(
        &self,
        cmd: &CommandSpec,
        interrupt: &InterruptFlag,
        grace: Duration,
    ) -> Result<ServeOutcome, LaunchError>;
}

/// Runner backed by `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, cmd: &CommandSpec) -> Result<RunStatus, LaunchError> {
        let status = cmd
            .to_command()
            .status()
            .map_err(|source| LaunchError::Spawn {
                program: cmd.program.to_string_lossy().into_owned(),
                source,
            })?;
        Ok(status.into())
    }

    fn capture(&self, cmd: &CommandSpec) -> Result<CommandOutput, LaunchError> {
        let output = cmd
            .to_command()
            .stdout(Stdio::piped())
            .output()
            .map_err(|source| LaunchError::Spawn {
                program: cmd.program.to_string_lossy().into_owned(),
                source,
            })?;
        Ok(CommandOutput {
            status: output.status.into(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        })
    }

    fn supervise(
        &self,
        cmd: &CommandSpec,
        interrupt: &InterruptFlag,
        grace: Duration,
    ) -> Result<ServeOutcome, LaunchError> {
        let child = cmd
            .to_command()
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: cmd.program.to_string_lossy().into_owned(),
                source,
            })?;
        let mut child = ManagedChild::new(child, grace);
        tracing::debug!(pid = child.id(), "Child started");

        loop {
            // Checked first: a terminal Ctrl+C also reaches the child, which may
            // already have exited by the time we look.
            if interrupt.is_set() {
                tracing::info!(pid = child.id(), "Interrupt received, stopping child");
                let status = child.terminate();
                tracing::debug!(?status, "Child stopped");
                return Ok(ServeOutcome::Interrupted);
            }
            if let Some(status) = child
                .try_wait()
                .map_err(|e| LaunchError::io("Failed to wait for child", e))?
            {
                return Ok(ServeOutcome::Exited(status));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}
