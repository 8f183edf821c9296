//! Child process lifetime: interrupt flag and a scoped child guard.
//!
//! [`ManagedChild`] guarantees the child is signalled on every exit path. Dropping
//! an unreaped child sends SIGTERM, waits up to the grace period, then SIGKILLs.

use std::process::Child;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::LaunchError;
use crate::process::RunStatus;

/// Poll interval for `try_wait` while supervising or terminating.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Shared one-shot interrupt flag, set from the signal handler.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a flag wired to SIGINT, SIGTERM and SIGHUP, so a platform stop
    /// (SIGTERM) shuts the server down the same way Ctrl+C does.
    /// Can be installed once per process.
    pub fn install_ctrlc() -> Result<Self, LaunchError> {
        let flag = Self::new();
        let handler_flag = flag.clone();
        ctrlc::set_handler(move || {
            handler_flag.trigger();
        })?;
        Ok(flag)
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Owns a running child and terminates it when dropped.
pub struct ManagedChild {
    child: Child,
    grace: Duration,
    reaped: Option<RunStatus>,
}

impl ManagedChild {
    pub fn new(child: Child, grace: Duration) -> Self {
        Self {
            child,
            grace,
            reaped: None,
        }
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    /// Non-blocking status check. Once the child has exited the status is cached.
    pub fn try_wait(&mut self) -> std::io::Result<Option<RunStatus>> {
        if let Some(status) = self.reaped {
            return Ok(Some(status));
        }
        let status = self.child.try_wait()?.map(RunStatus::from);
        self.reaped = status;
        Ok(status)
    }

    /// SIGTERM, wait up to the grace period, then SIGKILL. Returns the final
    /// status, or `None` if the child could not be reaped.
    pub fn terminate(&mut self) -> Option<RunStatus> {
        if let Ok(Some(status)) = self.try_wait() {
            return Some(status);
        }

        request_stop(&mut self.child);

        let deadline = Instant::now() + self.grace;
        while Instant::now() < deadline {
            match self.try_wait() {
                Ok(Some(status)) => return Some(status),
                Ok(None) => thread::sleep(POLL_INTERVAL.min(self.grace)),
                Err(_) => break,
            }
        }

        tracing::warn!(
            pid = self.child.id(),
            grace_secs = self.grace.as_secs(),
            "Child did not stop within grace period, killing"
        );
        let _ = self.child.kill();
        let status = self.child.wait().ok().map(RunStatus::from);
        self.reaped = status;
        status
    }
}

impl Drop for ManagedChild {
    fn drop(&mut self) {
        if self.reaped.is_none() {
            self.terminate();
        }
    }
}

#[cfg(unix)]
fn request_stop(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Err(e) = kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM) {
        tracing::debug!(error = %e, "SIGTERM failed");
    }
}

#[cfg(not(unix))]
fn request_stop(child: &mut Child) {
    let _ = child.kill();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::{Command, Stdio};

    fn spawn(program: &str, args: &[&str]) -> Child {
        Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap()
    }

    fn is_alive(pid: u32) -> bool {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;
        kill(Pid::from_raw(pid as i32), None::<Signal>).is_ok()
    }

    #[test]
    fn test_interrupt_flag_is_shared() {
        let flag = InterruptFlag::new();
        let clone = flag.clone();
        assert!(!flag.is_set());
        clone.trigger();
        assert!(flag.is_set());
    }

    #[test]
    fn test_sigterm_sets_interrupt_flag() {
        use nix::sys::signal::{raise, Signal};

        // The only handler installation in this test binary.
        let flag = InterruptFlag::install_ctrlc().unwrap();
        raise(Signal::SIGTERM).unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while !flag.is_set() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(flag.is_set());
    }

    #[test]
    fn test_terminate_sends_sigterm() {
        let mut child = ManagedChild::new(spawn("sleep", &["30"]), Duration::from_secs(5));
        let status = child.terminate().unwrap();
        // Killed by a signal: no exit code.
        assert_eq!(status.code, None);
    }

    #[test]
    fn test_terminate_escalates_after_grace() {
        let mut child = ManagedChild::new(
            spawn("/bin/sh", &["-c", "trap '' TERM; while true; do sleep 1; done"]),
            Duration::from_millis(400),
        );
        // Give the shell time to install its trap.
        thread::sleep(Duration::from_millis(200));
        let start = Instant::now();
        let status = child.terminate().unwrap();
        assert!(start.elapsed() >= Duration::from_millis(400));
        assert_eq!(status.code, None);
    }

    #[test]
    fn test_drop_terminates_running_child() {
        let child = ManagedChild::new(spawn("sleep", &["30"]), Duration::from_secs(5));
        let pid = child.id();
        drop(child);
        assert!(!is_alive(pid));
    }

    #[test]
    fn test_exited_child_is_not_signalled() {
        let mut child = ManagedChild::new(spawn("/bin/sh", &["-c", "exit 4"]), Duration::from_secs(1));
        let deadline = Instant::now() + Duration::from_secs(5);
        while child.try_wait().unwrap().is_none() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(child.terminate(), Some(RunStatus::from_code(4)));
    }
}
