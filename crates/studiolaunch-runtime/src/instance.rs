//! Best-effort reset of a previously launched application instance.

use std::thread;
use std::time::Duration;

use crate::process::{CommandSpec, ProcessRunner};

/// `pgrep -f` patterns for prior instances: the console script, and the
/// management-script server started by an earlier launch.
pub const KILL_PATTERNS: &[&str] = &["label-studio", "label_studio/manage.py runserver"];

/// Force-kill anything matching [`KILL_PATTERNS`], then wait `settle` so the
/// old process releases the port. Failures (including "no process matched")
/// are logged at debug level and otherwise ignored.
pub fn reset_prior_instances(runner: &dyn ProcessRunner, settle: Duration) {
    kill_matching(runner, KILL_PATTERNS);
    if !settle.is_zero() {
        thread::sleep(settle);
    }
}

/// SIGKILL every process whose command line matches one of `patterns`,
/// except this process and its parent. A launcher started with
/// `--home /srv/label-studio` matches its own patterns.
/// Returns the pids a kill was issued for.
pub fn kill_matching(runner: &dyn ProcessRunner, patterns: &[&str]) -> Vec<u32> {
    let protected = protected_pids();
    let mut killed = Vec::new();
    for &pattern in patterns {
        let targets: Vec<u32> = matching_pids(runner, pattern)
            .into_iter()
            .filter(|pid| !protected.contains(pid) && !killed.contains(pid))
            .collect();
        if targets.is_empty() {
            tracing::debug!(pattern, "No prior instance");
            continue;
        }
        let cmd = CommandSpec::new("kill")
            .arg("-9")
            .args(targets.iter().map(u32::to_string))
            .quiet();
        match runner.run(&cmd) {
            Ok(status) => tracing::debug!(pattern, ?targets, code = ?status.code, "kill"),
            Err(e) => tracing::debug!(pattern, error = %e, "kill unavailable"),
        }
        killed.extend(targets);
    }
    killed
}

fn matching_pids(runner: &dyn ProcessRunner, pattern: &str) -> Vec<u32> {
    let cmd = CommandSpec::new("pgrep").args(["-f", pattern]);
    match runner.capture(&cmd) {
        Ok(out) => out
            .stdout
            .lines()
            .filter_map(|line| line.trim().parse().ok())
            .collect(),
        Err(e) => {
            tracing::debug!(pattern, error = %e, "pgrep unavailable");
            Vec::new()
        }
    }
}

fn protected_pids() -> Vec<u32> {
    let mut pids = vec![std::process::id()];
    #[cfg(unix)]
    pids.push(std::os::unix::process::parent_id());
    pids
}
